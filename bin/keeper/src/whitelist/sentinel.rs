//! Registers every factory pool with the randomness provider.
//!
//! A pool that is not on the client's whitelist cannot receive randomness
//! callbacks, so its draws would hang. The sentinel reads the whitelist
//! flag per pool and only sends a transaction for pools that are missing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::chain::{ChainError, WhitelistRegistry, WhitelistSubmitter};
use crate::keeper::PeriodicTask;

#[derive(Debug, Clone)]
pub struct WhitelistSentinelConfig {
    pub callback_gas_price: u128,
    pub callback_gas_limit: u128,
    /// Pause after each registration transaction
    pub tx_delay: Duration,
    /// Use this client wallet instead of reading it from the factory
    pub client_override: Option<Address>,
}

impl Default for WhitelistSentinelConfig {
    fn default() -> Self {
        Self {
            callback_gas_price: 1_000_000_000,
            callback_gas_limit: 8_000_000_000,
            tx_delay: Duration::from_millis(1_000),
            client_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitelistSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Already registered
    pub skipped: usize,
    pub total: usize,
}

impl fmt::Display for WhitelistSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} already registered, {} total",
            self.succeeded, self.failed, self.skipped, self.total
        )
    }
}

pub struct WhitelistSentinel<R, S> {
    registry: Arc<R>,
    submitter: Arc<S>,
    config: WhitelistSentinelConfig,
}

impl<R, S> WhitelistSentinel<R, S>
where
    R: WhitelistRegistry,
    S: WhitelistSubmitter,
{
    pub fn new(registry: Arc<R>, submitter: Arc<S>, config: WhitelistSentinelConfig) -> Self {
        Self {
            registry,
            submitter,
            config,
        }
    }

    async fn client(&self) -> Result<Address, ChainError> {
        match self.config.client_override {
            Some(client) => Ok(client),
            None => self.registry.client_address().await,
        }
    }

    pub async fn run_pass(&self) -> Result<WhitelistSummary, ChainError> {
        let client = self.client().await?;
        let pools = self.registry.pool_addresses().await?;
        tracing::info!(client = %client, "🔍 Checking whitelist for {} pools", pools.len());

        let mut summary = WhitelistSummary {
            total: pools.len(),
            ..Default::default()
        };

        for pool in pools {
            match self.registry.is_whitelisted(client, pool).await {
                Ok(true) => {
                    tracing::debug!(pool = %pool, "Already whitelisted");
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(pool = %pool, "⚠️ Whitelist check failed: {}", e);
                    summary.failed += 1;
                    continue;
                }
            }

            tracing::info!(pool = %pool, "📝 Adding pool to whitelist");
            match self
                .submitter
                .add_to_whitelist(
                    pool,
                    self.config.callback_gas_price,
                    self.config.callback_gas_limit,
                )
                .await
            {
                Ok(receipt) if receipt.status => {
                    tracing::info!(pool = %pool, "✅ Whitelisted: {}", receipt);
                    summary.succeeded += 1;
                }
                Ok(receipt) => {
                    tracing::error!(pool = %pool, "❌ Whitelist tx reverted: {}", receipt);
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!(pool = %pool, "❌ Whitelist tx failed: {}", e);
                    summary.failed += 1;
                }
            }

            tokio::time::sleep(self.config.tx_delay).await;
        }

        Ok(summary)
    }
}

#[async_trait]
impl<R, S> PeriodicTask for WhitelistSentinel<R, S>
where
    R: WhitelistRegistry,
    S: WhitelistSubmitter,
{
    fn name(&self) -> &'static str {
        "whitelist"
    }

    async fn run_iteration(&self) -> Result<(), ChainError> {
        let summary = self.run_pass().await?;
        tracing::info!("📊 Whitelist summary: {}", summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::PoolDirectory;
    use crate::onchain::TxReceipt;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const CLIENT: Address = Address::new([0xc1; 20]);

    /// Whitelist that the fake submitter writes into, so a second pass sees
    /// the registrations made by the first.
    #[derive(Default)]
    struct FakeDeposit {
        pools: Vec<Address>,
        whitelisted: Mutex<HashSet<(Address, Address)>>,
        sent: Mutex<Vec<(Address, u128, u128)>>,
        client_reads: Mutex<usize>,
    }

    impl FakeDeposit {
        fn sent(&self) -> Vec<(Address, u128, u128)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PoolDirectory for FakeDeposit {
        async fn pool_addresses(&self) -> Result<Vec<Address>, ChainError> {
            Ok(self.pools.clone())
        }
    }

    #[async_trait]
    impl WhitelistRegistry for FakeDeposit {
        async fn client_address(&self) -> Result<Address, ChainError> {
            *self.client_reads.lock().unwrap() += 1;
            Ok(CLIENT)
        }

        async fn is_whitelisted(&self, client: Address, pool: Address) -> Result<bool, ChainError> {
            Ok(self.whitelisted.lock().unwrap().contains(&(client, pool)))
        }
    }

    #[async_trait]
    impl WhitelistSubmitter for FakeDeposit {
        async fn add_to_whitelist(
            &self,
            pool: Address,
            callback_gas_price: u128,
            callback_gas_limit: u128,
        ) -> Result<TxReceipt, ChainError> {
            self.sent
                .lock()
                .unwrap()
                .push((pool, callback_gas_price, callback_gas_limit));
            self.whitelisted.lock().unwrap().insert((CLIENT, pool));
            Ok(TxReceipt {
                tx_hash: "0xdef".into(),
                block_number: 7,
                gas_used: 50_000,
                status: true,
            })
        }
    }

    fn sentinel(deposit: Arc<FakeDeposit>, client_override: Option<Address>) -> WhitelistSentinel<FakeDeposit, FakeDeposit> {
        WhitelistSentinel::new(
            deposit.clone(),
            deposit,
            WhitelistSentinelConfig {
                tx_delay: Duration::ZERO,
                client_override,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_registers_missing_pool_once() {
        let registered = Address::repeat_byte(0x01);
        let missing = Address::repeat_byte(0x02);
        let deposit = Arc::new(FakeDeposit {
            pools: vec![registered, missing],
            ..Default::default()
        });
        deposit
            .whitelisted
            .lock()
            .unwrap()
            .insert((CLIENT, registered));
        let sentinel = sentinel(deposit.clone(), None);

        let first = sentinel.run_pass().await.unwrap();
        assert_eq!(deposit.sent(), vec![(missing, 1_000_000_000, 8_000_000_000)]);
        assert_eq!(
            first,
            WhitelistSummary {
                succeeded: 1,
                failed: 0,
                skipped: 1,
                total: 2
            }
        );

        let second = sentinel.run_pass().await.unwrap();
        assert_eq!(deposit.sent().len(), 1);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.succeeded, 0);
    }

    #[tokio::test]
    async fn test_client_override_skips_factory_read() {
        let pool = Address::repeat_byte(0x01);
        let other_client = Address::repeat_byte(0xc2);
        let deposit = Arc::new(FakeDeposit {
            pools: vec![pool],
            ..Default::default()
        });
        deposit
            .whitelisted
            .lock()
            .unwrap()
            .insert((other_client, pool));
        let sentinel = sentinel(deposit.clone(), Some(other_client));

        let summary = sentinel.run_pass().await.unwrap();

        assert_eq!(*deposit.client_reads.lock().unwrap(), 0);
        assert!(deposit.sent().is_empty());
        assert_eq!(summary.skipped, 1);
    }
}
