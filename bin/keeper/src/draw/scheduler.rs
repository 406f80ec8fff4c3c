//! Draw scheduler
//!
//! Walks every pool the factory knows about and sends `autoDraw()` to the
//! ones whose period has ended. Pools are handled one after another with a
//! pause between transactions; the submitter serializes the signer anyway,
//! the pause keeps the RPC and the mempool calm.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;

use super::eligibility::{schedule_gate, DrawDecision, SkipReason};
use crate::chain::{ChainError, DrawSubmitter, PoolReader};
use crate::keeper::PeriodicTask;

#[derive(Debug, Clone)]
pub struct DrawSchedulerConfig {
    /// Pause after each draw transaction
    pub tx_delay: Duration,
}

impl Default for DrawSchedulerConfig {
    fn default() -> Self {
        Self {
            tx_delay: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawSummary {
    pub checked: usize,
    pub triggered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for DrawSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pools checked, {} triggered, {} skipped, {} failed",
            self.checked, self.triggered, self.skipped, self.failed
        )
    }
}

pub struct DrawScheduler<R, S> {
    reader: Arc<R>,
    submitter: Arc<S>,
    config: DrawSchedulerConfig,
}

impl<R, S> DrawScheduler<R, S>
where
    R: PoolReader,
    S: DrawSubmitter,
{
    pub fn new(reader: Arc<R>, submitter: Arc<S>, config: DrawSchedulerConfig) -> Self {
        Self {
            reader,
            submitter,
            config,
        }
    }

    /// Decide whether `pool` should be drawn at `now`.
    pub async fn evaluate(&self, pool: Address, now: u64) -> Result<DrawDecision, ChainError> {
        let status = self.reader.pool_status(pool).await?;
        if let Err(reason) = schedule_gate(&status, now) {
            return Ok(DrawDecision::Skip(reason));
        }

        let nonce = self.reader.pending_nonce(pool).await?;
        if !nonce.is_zero() {
            return Ok(DrawDecision::Skip(SkipReason::DrawPending { nonce }));
        }

        let cycle = status.current_cycle;
        if self.reader.cycle_completed(pool, cycle).await? {
            return Ok(DrawDecision::Skip(SkipReason::CycleCompleted { cycle }));
        }

        // Informational only: the contract liquidates collateral for missing
        // payments during the draw.
        let contributed = match self.reader.cycle_contribution_count(pool, cycle).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::debug!(pool = %pool, "Contribution count unavailable: {}", e);
                None
            }
        };
        if let Some(count) = contributed {
            let max = u64::from(status.max_members);
            if count < max {
                tracing::info!(
                    pool = %pool,
                    "📉 Cycle {}: {}/{} contributed - will auto-liquidate",
                    cycle,
                    count,
                    max
                );
            }
        }

        Ok(DrawDecision::Trigger { cycle, contributed })
    }

    pub async fn run_pass(&self) -> Result<DrawSummary, ChainError> {
        self.run_pass_at(chrono::Utc::now().timestamp().max(0) as u64)
            .await
    }

    /// One pass over all pools with `now` as the wall clock.
    pub async fn run_pass_at(&self, now: u64) -> Result<DrawSummary, ChainError> {
        let pools = self.reader.pool_addresses().await?;
        tracing::info!("🔍 Checking {} pools for draws", pools.len());

        let mut summary = DrawSummary::default();
        for pool in pools {
            summary.checked += 1;

            let cycle = match self.evaluate(pool, now).await {
                Ok(DrawDecision::Trigger { cycle, .. }) => cycle,
                Ok(DrawDecision::Skip(reason)) => {
                    tracing::info!(pool = %pool, "⏭️  Skipping: {}", reason);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(pool = %pool, "⏭️  Skipping, could not read pool: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            tracing::info!(pool = %pool, cycle, "🎲 Triggering draw");
            match self.submitter.trigger_draw(pool).await {
                Ok(receipt) if receipt.status => {
                    tracing::info!(pool = %pool, "✅ Draw triggered: {}", receipt);
                    summary.triggered += 1;
                }
                Ok(receipt) => {
                    tracing::error!(pool = %pool, "❌ Draw reverted: {}", receipt);
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!(pool = %pool, "❌ Draw failed: {}", e);
                    summary.failed += 1;
                }
            }

            tokio::time::sleep(self.config.tx_delay).await;
        }

        Ok(summary)
    }
}

#[async_trait]
impl<R, S> PeriodicTask for DrawScheduler<R, S>
where
    R: PoolReader,
    S: DrawSubmitter,
{
    fn name(&self) -> &'static str {
        "draw"
    }

    async fn run_iteration(&self) -> Result<(), ChainError> {
        let summary = self.run_pass().await?;
        tracing::info!("📊 Draw summary: {}", summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PoolDirectory, PoolStatus};
    use crate::onchain::TxReceipt;
    use alloy_primitives::U256;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const T0: u64 = 1_700_000_000;
    const PERIOD: u64 = 2_592_000;

    #[derive(Clone)]
    struct FakePool {
        status: PoolStatus,
        pending_nonce: U256,
        cycle_completed: bool,
        contributed: u64,
    }

    #[derive(Default)]
    struct FakeChain {
        pools: Vec<Address>,
        state: HashMap<Address, FakePool>,
        unreadable: Vec<Address>,
    }

    impl FakeChain {
        fn with_pool(mut self, address: Address, pool: FakePool) -> Self {
            self.pools.push(address);
            self.state.insert(address, pool);
            self
        }

        fn get(&self, pool: Address) -> Result<&FakePool, ChainError> {
            if self.unreadable.contains(&pool) {
                return Err(ChainError::RpcError("timeout".into()));
            }
            self.state
                .get(&pool)
                .ok_or_else(|| ChainError::RpcError("no such pool".into()))
        }
    }

    #[async_trait]
    impl PoolDirectory for FakeChain {
        async fn pool_addresses(&self) -> Result<Vec<Address>, ChainError> {
            Ok(self.pools.clone())
        }
    }

    #[async_trait]
    impl PoolReader for FakeChain {
        async fn pool_status(&self, pool: Address) -> Result<PoolStatus, ChainError> {
            Ok(self.get(pool)?.status)
        }

        async fn pending_nonce(&self, pool: Address) -> Result<U256, ChainError> {
            Ok(self.get(pool)?.pending_nonce)
        }

        async fn cycle_completed(&self, pool: Address, _cycle: u64) -> Result<bool, ChainError> {
            Ok(self.get(pool)?.cycle_completed)
        }

        async fn cycle_contribution_count(&self, pool: Address, _cycle: u64) -> Result<u64, ChainError> {
            Ok(self.get(pool)?.contributed)
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        sent: Mutex<Vec<Address>>,
        revert: Vec<Address>,
    }

    impl RecordingSubmitter {
        fn sent(&self) -> Vec<Address> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DrawSubmitter for RecordingSubmitter {
        async fn trigger_draw(&self, pool: Address) -> Result<TxReceipt, ChainError> {
            self.sent.lock().unwrap().push(pool);
            if self.revert.contains(&pool) {
                return Err(ChainError::Reverted {
                    tx_hash: None,
                    reason: "execution reverted".into(),
                });
            }
            Ok(TxReceipt {
                tx_hash: "0xabc".into(),
                block_number: 1,
                gas_used: 21_000,
                status: true,
            })
        }
    }

    fn ready_pool() -> FakePool {
        FakePool {
            status: PoolStatus {
                state: 1,
                max_members: 5,
                current_members: 5,
                period_duration: PERIOD,
                current_cycle: 0,
                total_cycles: 5,
                cycle_start_time: T0,
            },
            pending_nonce: U256::ZERO,
            cycle_completed: false,
            contributed: 5,
        }
    }

    fn scheduler(chain: FakeChain, submitter: Arc<RecordingSubmitter>) -> DrawScheduler<FakeChain, RecordingSubmitter> {
        DrawScheduler::new(
            Arc::new(chain),
            submitter,
            DrawSchedulerConfig {
                tx_delay: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_triggers_when_period_elapsed() {
        let pool = Address::repeat_byte(0x01);
        let submitter = Arc::new(RecordingSubmitter::default());
        let scheduler = scheduler(FakeChain::default().with_pool(pool, ready_pool()), submitter.clone());

        let summary = scheduler.run_pass_at(T0 + PERIOD).await.unwrap();

        assert_eq!(submitter.sent(), vec![pool]);
        assert_eq!(
            summary,
            DrawSummary {
                checked: 1,
                triggered: 1,
                skipped: 0,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_never_triggers_ineligible_pools() {
        let open = Address::repeat_byte(0x01);
        let early = Address::repeat_byte(0x02);
        let pending = Address::repeat_byte(0x03);
        let completed = Address::repeat_byte(0x04);

        let mut open_pool = ready_pool();
        open_pool.status.state = 0;
        let mut pending_pool = ready_pool();
        pending_pool.pending_nonce = U256::from(7u64);
        let mut completed_pool = ready_pool();
        completed_pool.cycle_completed = true;

        let chain = FakeChain::default()
            .with_pool(open, open_pool)
            .with_pool(early, ready_pool())
            .with_pool(pending, pending_pool)
            .with_pool(completed, completed_pool);
        let submitter = Arc::new(RecordingSubmitter::default());
        let scheduler = scheduler(chain, submitter.clone());

        // `early` needs one more second
        let summary = scheduler.run_pass_at(T0 + PERIOD - 1).await.unwrap();
        assert!(submitter.sent().is_empty());
        assert_eq!(summary.skipped, 4);

        let summary = scheduler.run_pass_at(T0 + PERIOD).await.unwrap();
        assert_eq!(submitter.sent(), vec![early]);
        assert_eq!(summary.triggered, 1);
        assert_eq!(summary.skipped, 3);
    }

    #[tokio::test]
    async fn test_partial_contributions_still_trigger() {
        let pool = Address::repeat_byte(0x01);
        let mut short = ready_pool();
        short.contributed = 3;
        let submitter = Arc::new(RecordingSubmitter::default());
        let scheduler = scheduler(FakeChain::default().with_pool(pool, short), submitter.clone());

        let decision = scheduler.evaluate(pool, T0 + PERIOD).await.unwrap();
        assert_eq!(
            decision,
            DrawDecision::Trigger {
                cycle: 0,
                contributed: Some(3)
            }
        );
    }

    #[tokio::test]
    async fn test_revert_and_read_errors_do_not_abort_batch() {
        let reverting = Address::repeat_byte(0x01);
        let unreadable = Address::repeat_byte(0x02);
        let healthy = Address::repeat_byte(0x03);

        let mut chain = FakeChain::default()
            .with_pool(reverting, ready_pool())
            .with_pool(unreadable, ready_pool())
            .with_pool(healthy, ready_pool());
        chain.unreadable.push(unreadable);

        let submitter = Arc::new(RecordingSubmitter {
            revert: vec![reverting],
            ..Default::default()
        });
        let scheduler = scheduler(chain, submitter.clone());

        let summary = scheduler.run_pass_at(T0 + PERIOD).await.unwrap();

        assert_eq!(submitter.sent(), vec![reverting, healthy]);
        assert_eq!(
            summary,
            DrawSummary {
                checked: 3,
                triggered: 1,
                skipped: 1,
                failed: 1
            }
        );
    }
}
