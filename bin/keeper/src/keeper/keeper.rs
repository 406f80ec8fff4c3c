use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::chain::ChainError;

/// One unit of periodic keeper work: a draw pass or a whitelist pass.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_iteration(&self) -> Result<(), ChainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Single pass, then exit
    Once,
    /// Repeat on a fixed interval until cancelled
    Watch,
}

#[derive(Debug, Clone)]
pub struct KeeperLoopConfig {
    pub interval: Duration,
}

impl Default for KeeperLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Drives a [`PeriodicTask`]. Cancellation is checked between iterations;
/// an iteration that has started always runs to the end.
pub struct KeeperLoop<T> {
    task: Arc<T>,
    config: KeeperLoopConfig,
    cancel_token: CancellationToken,
}

impl<T: PeriodicTask> KeeperLoop<T> {
    pub fn new(task: Arc<T>, config: KeeperLoopConfig, cancel_token: CancellationToken) -> Self {
        Self {
            task,
            config,
            cancel_token,
        }
    }

    pub async fn run(&self, mode: RunMode) -> Result<(), ChainError> {
        match mode {
            RunMode::Once => self.run_once().await,
            RunMode::Watch => {
                self.watch().await;
                Ok(())
            }
        }
    }

    pub async fn run_once(&self) -> Result<(), ChainError> {
        tracing::info!(task = self.task.name(), "▶️  Running single pass");
        let result = self.task.run_iteration().await;
        if let Err(e) = &result {
            tracing::error!(task = self.task.name(), "❌ Iteration failed: {}", e);
        }
        result
    }

    /// Loop until cancelled. A failed iteration is logged and the next one
    /// runs after the usual interval.
    pub async fn watch(&self) {
        let name = self.task.name();
        tracing::info!(task = name, "🚀 Starting keeper loop");
        tracing::info!(task = name, "  Interval: {}s", self.config.interval.as_secs());

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut iteration: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    tracing::info!(task = name, "🛑 Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    iteration += 1;
                    tracing::debug!(task = name, iteration, "⏰ Tick");
                    if let Err(e) = self.task.run_iteration().await {
                        tracing::error!(task = name, iteration, "❌ Iteration failed: {}", e);
                    }
                }
            }
        }

        tracing::info!(task = name, iterations = iteration, "✓ Keeper loop stopped");
    }
}
