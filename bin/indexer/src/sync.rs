//! Sync service: poll log ranges, apply them, checkpoint.
//!
//! The cursor only advances after a range has been applied and the snapshot
//! written, so a crash replays at most the last range. Replays are harmless
//! because every ingest handler is idempotent.

use std::sync::Arc;
use std::time::Duration;

use alloy::providers::Provider;
use common::projection::{ProjectionSnapshot, ProjectionStore, SnapshotManager};
use parking_lot::{Mutex, RwLock};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::chain::{ChainError, LogPoller};
use crate::ingestor::{BatchStats, Ingestor};
use crate::registry::ContractRegistry;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// First block to index when no snapshot exists
    pub start_block: u64,
    pub poll_interval_ms: u64,
}

/// Result of one `sync_once` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub from_block: u64,
    pub to_block: u64,
    pub ranges: usize,
    pub stats: BatchStats,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "blocks {}..={} in {} range(s), {}",
            self.from_block, self.to_block, self.ranges, self.stats
        )
    }
}

pub struct IndexerService<P> {
    poller: LogPoller<P>,
    registry: Arc<ContractRegistry>,
    ingestor: Ingestor,
    snapshots: SnapshotManager,
    next_block: Mutex<u64>,
    config: SyncConfig,
    cancel_token: CancellationToken,
}

impl<P: Provider> IndexerService<P> {
    /// Build the service from a loaded snapshot; resumes after its last
    /// synced block, or at `start_block` for a fresh store.
    pub fn resume(
        poller: LogPoller<P>,
        registry: Arc<ContractRegistry>,
        store: Arc<RwLock<ProjectionStore>>,
        snapshots: SnapshotManager,
        last_synced_block: Option<u64>,
        config: SyncConfig,
    ) -> Self {
        let next_block = match last_synced_block {
            Some(block) => block + 1,
            None => config.start_block,
        };
        Self {
            poller,
            ingestor: Ingestor::new(registry.clone(), store),
            registry,
            snapshots,
            next_block: Mutex::new(next_block),
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn next_block(&self) -> u64 {
        *self.next_block.lock()
    }

    /// Catch up to the safe head in bounded ranges.
    pub async fn sync_once(&self) -> Result<SyncReport, ChainError> {
        let head = self.poller.safe_head().await?;
        let from_block = self.next_block();
        let mut report = SyncReport {
            from_block,
            to_block: from_block.saturating_sub(1),
            ..Default::default()
        };
        if from_block > head {
            return Ok(report);
        }

        let range = self.poller.config().max_block_range;
        let mut start = from_block;
        while start <= head {
            if self.cancel_token.is_cancelled() {
                break;
            }
            let end = head.min(start.saturating_add(range - 1));
            let envelopes = self.poller.fetch_range(&self.registry, start, end).await?;
            let stats = self.ingestor.ingest_batch(&envelopes);

            tracing::debug!(from = start, to = end, "📦 {}", stats);
            report.stats.inserted += stats.inserted;
            report.stats.updated += stats.updated;
            report.stats.unchanged += stats.unchanged;
            report.stats.skipped += stats.skipped;
            report.ranges += 1;
            report.to_block = end;

            *self.next_block.lock() = end + 1;
            self.checkpoint(end);
            start = end + 1;
        }

        Ok(report)
    }

    fn checkpoint(&self, last_synced_block: u64) {
        let snapshot = ProjectionSnapshot {
            last_synced_block: Some(last_synced_block),
            watched: self.registry.to_watched(),
            projection: self.ingestor.store().read().clone(),
        };
        if let Err(e) = self.snapshots.save(&snapshot) {
            tracing::error!("❌ Failed to write snapshot {}: {}", self.snapshots.path(), e);
        }
    }

    /// Poll until cancelled. RPC failures are logged and retried on the
    /// next tick.
    pub async fn run(self: Arc<Self>) -> Result<(), ChainError> {
        tracing::info!(
            "📊 Indexing from block {} (interval: {}ms, {} pools watched)",
            self.next_block(),
            self.config.poll_interval_ms,
            self.registry.pool_count()
        );

        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    tracing::info!("🛑 Shutdown signal received");
                    break;
                }
                _ = poll_interval.tick() => {
                    match self.sync_once().await {
                        Ok(report) if report.ranges > 0 => tracing::info!("✅ Synced {}", report),
                        Ok(_) => tracing::trace!("No new blocks"),
                        Err(e) => tracing::error!("Polling error: {}", e),
                    }
                }
            }
        }

        Ok(())
    }
}
