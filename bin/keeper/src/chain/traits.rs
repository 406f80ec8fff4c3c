use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use common::projection::PoolState;

use super::ChainError;
use crate::onchain::TxReceipt;

/// Live pool counters as returned by `getPoolInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Raw on-chain state value
    pub state: u8,
    pub max_members: u8,
    pub current_members: u64,
    pub period_duration: u64,
    pub current_cycle: u64,
    pub total_cycles: u64,
    pub cycle_start_time: u64,
}

impl PoolStatus {
    pub fn state(&self) -> Option<PoolState> {
        PoolState::from_onchain(self.state)
    }

    pub fn period_end(&self) -> u64 {
        self.cycle_start_time.saturating_add(self.period_duration)
    }
}

/// Enumerates pools from the factory.
#[async_trait]
pub trait PoolDirectory: Send + Sync {
    /// All pools the factory knows about. A pool whose address cannot be
    /// read is logged and left out.
    async fn pool_addresses(&self) -> Result<Vec<Address>, ChainError>;
}

/// Reads the draw-relevant state of a pool.
#[async_trait]
pub trait PoolReader: PoolDirectory {
    async fn pool_status(&self, pool: Address) -> Result<PoolStatus, ChainError>;

    /// Nonzero while a randomness request is outstanding.
    async fn pending_nonce(&self, pool: Address) -> Result<U256, ChainError>;

    async fn cycle_completed(&self, pool: Address, cycle: u64) -> Result<bool, ChainError>;

    async fn cycle_contribution_count(&self, pool: Address, cycle: u64) -> Result<u64, ChainError>;
}

/// Reads the randomness-provider whitelist.
#[async_trait]
pub trait WhitelistRegistry: PoolDirectory {
    /// Client wallet the pools are registered under.
    async fn client_address(&self) -> Result<Address, ChainError>;

    async fn is_whitelisted(&self, client: Address, pool: Address) -> Result<bool, ChainError>;
}

#[async_trait]
pub trait DrawSubmitter: Send + Sync {
    /// Send `autoDraw()` to the pool and wait for the receipt.
    async fn trigger_draw(&self, pool: Address) -> Result<TxReceipt, ChainError>;
}

#[async_trait]
pub trait WhitelistSubmitter: Send + Sync {
    async fn add_to_whitelist(
        &self,
        pool: Address,
        callback_gas_price: u128,
        callback_gas_limit: u128,
    ) -> Result<TxReceipt, ChainError>;
}
