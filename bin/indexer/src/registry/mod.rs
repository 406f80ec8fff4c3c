//! Contract registry: which addresses the indexer listens to and from which
//! log position each one is valid.
//!
//! The factory is static. Pools are added when their `PoolCreated` log is
//! seen; a pool's own events are only accepted after that log.

use std::collections::HashMap;

use alloy_primitives::Address;
use common::projection::WatchedContract;
use parking_lot::RwLock;

use crate::chain::LogPosition;

/// Classification of a log's emitting address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Factory,
    Pool,
    /// Registered pool, but the log precedes its creation
    BeforeCreation { created_at: LogPosition },
    Unknown,
}

#[derive(Debug)]
pub struct ContractRegistry {
    factory: Address,
    pools: RwLock<HashMap<Address, LogPosition>>,
}

impl ContractRegistry {
    pub fn new(factory: Address) -> Self {
        Self {
            factory,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild from a persisted watch list.
    pub fn from_watched(factory: Address, watched: &[WatchedContract]) -> Self {
        let registry = Self::new(factory);
        for entry in watched {
            registry.add_pool(
                entry.address,
                LogPosition {
                    block_number: entry.created_at_block,
                    log_index: entry.created_at_log_index,
                },
            );
        }
        registry
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    /// Register a pool. Returns `true` if it was not known before. A pool
    /// seen twice keeps its earliest creation position.
    pub fn add_pool(&self, pool: Address, created_at: LogPosition) -> bool {
        let mut pools = self.pools.write();
        match pools.get_mut(&pool) {
            Some(existing) => {
                if created_at < *existing {
                    *existing = created_at;
                }
                false
            }
            None => {
                pools.insert(pool, created_at);
                true
            }
        }
    }

    pub fn classify(&self, source: Address, position: LogPosition) -> SourceKind {
        if source == self.factory {
            return SourceKind::Factory;
        }
        match self.pools.read().get(&source) {
            Some(created_at) if position > *created_at => SourceKind::Pool,
            Some(created_at) => SourceKind::BeforeCreation {
                created_at: *created_at,
            },
            None => SourceKind::Unknown,
        }
    }

    pub fn is_watched(&self, pool: &Address) -> bool {
        self.pools.read().contains_key(pool)
    }

    /// Pool addresses, sorted for stable log filters.
    pub fn watched_pools(&self) -> Vec<Address> {
        let mut pools: Vec<Address> = self.pools.read().keys().copied().collect();
        pools.sort();
        pools
    }

    pub fn pool_count(&self) -> usize {
        self.pools.read().len()
    }

    /// Watch list in persistable form.
    pub fn to_watched(&self) -> Vec<WatchedContract> {
        let mut watched: Vec<WatchedContract> = self
            .pools
            .read()
            .iter()
            .map(|(address, created_at)| WatchedContract {
                address: *address,
                created_at_block: created_at.block_number,
                created_at_log_index: created_at.log_index,
            })
            .collect();
        watched.sort_by_key(|w| (w.created_at_block, w.created_at_log_index));
        watched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(block_number: u64, log_index: u64) -> LogPosition {
        LogPosition {
            block_number,
            log_index,
        }
    }

    #[test]
    fn test_classify_sources() {
        let factory = Address::repeat_byte(0xfa);
        let pool = Address::repeat_byte(0x01);
        let registry = ContractRegistry::new(factory);

        assert_eq!(registry.classify(pool, pos(5, 0)), SourceKind::Unknown);
        assert!(registry.add_pool(pool, pos(10, 3)));

        assert_eq!(registry.classify(factory, pos(1, 0)), SourceKind::Factory);
        assert_eq!(registry.classify(pool, pos(10, 4)), SourceKind::Pool);
        assert_eq!(registry.classify(pool, pos(11, 0)), SourceKind::Pool);
        assert_eq!(
            registry.classify(pool, pos(10, 2)),
            SourceKind::BeforeCreation { created_at: pos(10, 3) }
        );
    }

    #[test]
    fn test_add_pool_is_idempotent_and_keeps_earliest() {
        let registry = ContractRegistry::new(Address::repeat_byte(0xfa));
        let pool = Address::repeat_byte(0x01);

        assert!(registry.add_pool(pool, pos(10, 3)));
        assert!(!registry.add_pool(pool, pos(12, 0)));
        assert!(!registry.add_pool(pool, pos(9, 0)));

        assert_eq!(registry.pool_count(), 1);
        assert_eq!(registry.to_watched()[0].created_at_block, 9);
    }

    #[test]
    fn test_watched_round_trip() {
        let factory = Address::repeat_byte(0xfa);
        let registry = ContractRegistry::new(factory);
        registry.add_pool(Address::repeat_byte(0x02), pos(20, 1));
        registry.add_pool(Address::repeat_byte(0x01), pos(10, 0));

        let restored = ContractRegistry::from_watched(factory, &registry.to_watched());
        assert_eq!(restored.watched_pools(), registry.watched_pools());
        assert!(restored.is_watched(&Address::repeat_byte(0x01)));
        assert_eq!(
            restored.classify(Address::repeat_byte(0x02), pos(20, 0)),
            SourceKind::BeforeCreation { created_at: pos(20, 1) }
        );
    }
}
