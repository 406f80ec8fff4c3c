//! HTTP log poller
//!
//! Fetches factory and pool logs for a bounded block range and returns them
//! decoded and sorted in canonical chain order. Pools created inside the
//! range are added to the registry before their own logs are requested, so
//! a pool's first events are never missed.

use std::collections::HashMap;

use alloy::eips::BlockNumberOrTag;
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy_primitives::{Log as PrimitiveLog, B256};
use parking_lot::Mutex;

use super::errors::ChainError;
use super::event_types::{parse_log, EventEnvelope, EventSignatures, LogMeta, PoolEvent};
use crate::registry::ContractRegistry;

#[derive(Debug, Clone)]
pub struct LogPollerConfig {
    /// Largest block span requested in one `eth_getLogs`
    pub max_block_range: u64,
    /// Blocks behind head treated as final
    pub confirmations: u64,
}

impl Default for LogPollerConfig {
    fn default() -> Self {
        Self {
            max_block_range: 2_000,
            confirmations: 0,
        }
    }
}

pub struct LogPoller<P> {
    primary: P,
    fallback: Option<P>,
    config: LogPollerConfig,
    block_timestamps: Mutex<HashMap<u64, u64>>,
}

impl<P: Provider> LogPoller<P> {
    pub fn new(primary: P, fallback: Option<P>, config: LogPollerConfig) -> Self {
        Self {
            primary,
            fallback,
            config,
            block_timestamps: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LogPollerConfig {
        &self.config
    }

    /// Highest block considered final.
    pub async fn safe_head(&self) -> Result<u64, ChainError> {
        let head = match self.primary.get_block_number().await {
            Ok(head) => head,
            Err(primary) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!("🔄 Primary RPC failed ({}), trying fallback", primary);
                    fallback.get_block_number().await.map_err(|e| {
                        ChainError::AllEndpointsFailed {
                            primary: primary.to_string(),
                            fallback: e.to_string(),
                        }
                    })?
                }
                None => return Err(ChainError::RpcError(primary.to_string())),
            },
        };
        Ok(head.saturating_sub(self.config.confirmations))
    }

    /// Decoded events in `[from_block, to_block]`, ordered by block then log
    /// index.
    pub async fn fetch_range(
        &self,
        registry: &ContractRegistry,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventEnvelope>, ChainError> {
        let factory_filter = Filter::new()
            .address(registry.factory())
            .event_signature(EventSignatures::factory())
            .from_block(from_block)
            .to_block(to_block);
        let factory_logs = self.get_logs(&factory_filter).await?;

        let mut envelopes = self.decode_logs(factory_logs).await?;

        // Discover pools before asking for their logs
        register_created_pools(registry, &envelopes);

        let pools = registry.watched_pools();
        if !pools.is_empty() {
            let pool_filter = Filter::new()
                .address(pools)
                .event_signature(EventSignatures::pool())
                .from_block(from_block)
                .to_block(to_block);
            let pool_logs = self.get_logs(&pool_filter).await?;
            envelopes.extend(self.decode_logs(pool_logs).await?);
        }

        self.block_timestamps.lock().retain(|block, _| *block >= from_block);

        Ok(into_chain_order(envelopes))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainError> {
        match self.primary.get_logs(filter).await {
            Ok(logs) => Ok(logs),
            Err(primary) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!("🔄 get_logs failed on primary ({}), trying fallback", primary);
                    fallback
                        .get_logs(filter)
                        .await
                        .map_err(|e| ChainError::AllEndpointsFailed {
                            primary: primary.to_string(),
                            fallback: e.to_string(),
                        })
                }
                None => Err(ChainError::RpcError(primary.to_string())),
            },
        }
    }

    async fn decode_logs(&self, logs: Vec<Log>) -> Result<Vec<EventEnvelope>, ChainError> {
        let mut envelopes = Vec::with_capacity(logs.len());
        for log in logs {
            if log.removed {
                continue;
            }
            let Some(block_number) = log.block_number else {
                tracing::warn!("Skipping pending log without block number");
                continue;
            };
            // Without an index the log cannot be placed in chain order
            let Some(log_index) = log.log_index else {
                tracing::warn!(
                    source = %log.address(),
                    block = block_number,
                    "Skipping log without log index"
                );
                continue;
            };
            let tx_hash = log.transaction_hash.unwrap_or(B256::ZERO);
            let block_timestamp = match log.block_timestamp {
                Some(ts) => ts,
                None => self.block_timestamp(block_number).await?,
            };

            let primitive_log = match PrimitiveLog::new(
                log.address(),
                log.topics().to_vec(),
                log.data().data.clone(),
            ) {
                Some(log) => log,
                None => {
                    tracing::warn!(block = block_number, log_index, "Skipping log with invalid topics");
                    continue;
                }
            };

            let meta = LogMeta {
                block_number,
                log_index,
                block_timestamp,
                tx_hash,
            };
            match parse_log(&primitive_log, meta) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => {
                    tracing::warn!(
                        source = %log.address(),
                        block = block_number,
                        log_index,
                        "Failed to parse log: {}",
                        e
                    );
                }
            }
        }
        Ok(envelopes)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainError> {
        let cached = self.block_timestamps.lock().get(&block_number).copied();
        if let Some(ts) = cached {
            return Ok(ts);
        }

        let tag = BlockNumberOrTag::Number(block_number);
        let block = match self.primary.get_block_by_number(tag).await {
            Ok(block) => block,
            Err(primary) => match &self.fallback {
                Some(fallback) => fallback.get_block_by_number(tag).await.map_err(|e| {
                    ChainError::AllEndpointsFailed {
                        primary: primary.to_string(),
                        fallback: e.to_string(),
                    }
                })?,
                None => return Err(ChainError::RpcError(primary.to_string())),
            },
        };
        let timestamp = block
            .map(|b| b.header.timestamp)
            .ok_or_else(|| ChainError::RpcError(format!("Block {} not found", block_number)))?;

        self.block_timestamps.lock().insert(block_number, timestamp);
        Ok(timestamp)
    }
}

/// Add every pool created by `envelopes` to the registry, keyed by the
/// position of its creation log.
pub fn register_created_pools(registry: &ContractRegistry, envelopes: &[EventEnvelope]) {
    for envelope in envelopes {
        if let PoolEvent::PoolCreated { pool, .. } = &envelope.event {
            if registry.add_pool(*pool, envelope.position()) {
                tracing::info!(pool = %pool, block = envelope.block_number, "🔍 Discovered pool");
            }
        }
    }
}

/// Sort by (block, log index) and drop repeated positions.
pub fn into_chain_order(mut envelopes: Vec<EventEnvelope>) -> Vec<EventEnvelope> {
    envelopes.sort_by_key(EventEnvelope::position);
    envelopes.dedup_by_key(|e| e.position());
    envelopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::LogPosition;
    use crate::registry::SourceKind;
    use alloy_primitives::{Address, U256};

    const FACTORY: Address = Address::new([0xfa; 20]);
    const POOL: Address = Address::new([0x01; 20]);

    fn envelope(source: Address, block_number: u64, log_index: u64, event: PoolEvent) -> EventEnvelope {
        EventEnvelope {
            source,
            block_number,
            log_index,
            block_timestamp: 1_700_000_000 + block_number,
            tx_hash: B256::ZERO,
            event,
        }
    }

    fn created(pool: Address) -> PoolEvent {
        PoolEvent::PoolCreated {
            pool,
            creator: Address::new([0xc0; 20]),
            max_members: 5,
            contribution_per_period: U256::from(100u64),
            period_duration: U256::from(2_592_000u64),
            yield_bonus_split: 50,
            name: "Savings".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_created_pool_is_watched_from_its_creation_log() {
        let registry = ContractRegistry::new(FACTORY);
        let factory_logs = vec![envelope(FACTORY, 10, 2, created(POOL))];

        register_created_pools(&registry, &factory_logs);

        assert_eq!(registry.watched_pools(), vec![POOL]);
        let same_block_later = LogPosition {
            block_number: 10,
            log_index: 3,
        };
        let same_block_earlier = LogPosition {
            block_number: 10,
            log_index: 1,
        };
        assert_eq!(registry.classify(POOL, same_block_later), SourceKind::Pool);
        assert!(matches!(
            registry.classify(POOL, same_block_earlier),
            SourceKind::BeforeCreation { .. }
        ));
    }

    #[test]
    fn test_merge_orders_by_block_then_log_index() {
        let merged = into_chain_order(vec![
            envelope(POOL, 12, 0, PoolEvent::PoolCompleted),
            envelope(FACTORY, 10, 2, created(POOL)),
            envelope(POOL, 11, 7, PoolEvent::PoolCompleted),
            envelope(POOL, 11, 3, PoolEvent::PoolCompleted),
            // same log returned twice across overlapping requests
            envelope(POOL, 11, 3, PoolEvent::PoolCompleted),
        ]);

        let positions: Vec<(u64, u64)> = merged
            .iter()
            .map(|e| (e.block_number, e.log_index))
            .collect();
        assert_eq!(positions, vec![(10, 2), (11, 3), (11, 7), (12, 0)]);
    }
}
