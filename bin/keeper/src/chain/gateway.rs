//! View calls against the factory, pools and the randomness deposit
//! contract. Each call goes to the primary endpoint first and is retried once
//! on the fallback before the error is returned.

use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use common::interfaces::factory::ISavingsFactory;
use common::interfaces::pool::ISavingsPool;
use common::interfaces::vrf_deposit::IVrfDeposit;
use common::projection::to_u64;

use super::traits::{PoolDirectory, PoolReader, PoolStatus, WhitelistRegistry};
use super::ChainError;

pub struct ChainGateway<P> {
    primary: P,
    fallback: Option<P>,
    factory: Address,
    vrf_deposit: Option<Address>,
}

impl<P: Provider> ChainGateway<P> {
    pub fn new(primary: P, fallback: Option<P>, factory: Address) -> Self {
        Self {
            primary,
            fallback,
            factory,
            vrf_deposit: None,
        }
    }

    pub fn with_vrf_deposit(mut self, vrf_deposit: Address) -> Self {
        self.vrf_deposit = Some(vrf_deposit);
        self
    }

    /// Block number on the primary endpoint, used as a startup probe.
    pub async fn ping(&self) -> Result<u64, ChainError> {
        self.primary
            .get_block_number()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    async fn call<C>(&self, to: Address, call: C) -> Result<C::Return, ChainError>
    where
        C: SolCall + Send,
        C::Return: Send,
    {
        let tx = TransactionRequest::default()
            .to(to)
            .input(call.abi_encode().into());

        let output = match self.primary.call(tx.clone()).await {
            Ok(output) => output,
            Err(primary) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        contract = %to,
                        "🔄 {} failed on primary ({}), trying fallback",
                        C::SIGNATURE,
                        primary
                    );
                    fallback
                        .call(tx)
                        .await
                        .map_err(|e| ChainError::AllEndpointsFailed {
                            primary: primary.to_string(),
                            fallback: e.to_string(),
                        })?
                }
                None => return Err(ChainError::RpcError(primary.to_string())),
            },
        };

        C::abi_decode_returns(&output).map_err(|e| ChainError::DecodeError {
            contract: to,
            reason: e.to_string(),
        })
    }

    fn require_vrf_deposit(&self) -> Result<Address, ChainError> {
        self.vrf_deposit.ok_or_else(|| {
            ChainError::InvalidConfig("randomness deposit contract not configured".to_string())
        })
    }
}

#[async_trait]
impl<P: Provider> PoolDirectory for ChainGateway<P> {
    async fn pool_addresses(&self) -> Result<Vec<Address>, ChainError> {
        let count = self
            .call(self.factory, ISavingsFactory::getPoolCountCall {})
            .await?;
        let count = to_u64(count);

        let mut pools = Vec::with_capacity(count as usize);
        for index in 0..count {
            let call = ISavingsFactory::getPoolCall {
                index: U256::from(index),
            };
            match self.call(self.factory, call).await {
                Ok(pool) => pools.push(pool),
                Err(e) => tracing::warn!("⚠️ Skipping pool #{}: {}", index, e),
            }
        }
        Ok(pools)
    }
}

#[async_trait]
impl<P: Provider> PoolReader for ChainGateway<P> {
    async fn pool_status(&self, pool: Address) -> Result<PoolStatus, ChainError> {
        let info = self.call(pool, ISavingsPool::getPoolInfoCall {}).await?;
        Ok(PoolStatus {
            state: info.state,
            max_members: info.maxMembers,
            current_members: to_u64(info.currentMembers),
            period_duration: to_u64(info.periodDuration),
            current_cycle: to_u64(info.currentCycle),
            total_cycles: to_u64(info.totalCycles),
            cycle_start_time: to_u64(info.cycleStartTime),
        })
    }

    async fn pending_nonce(&self, pool: Address) -> Result<U256, ChainError> {
        self.call(pool, ISavingsPool::pendingNonceCall {}).await
    }

    async fn cycle_completed(&self, pool: Address, cycle: u64) -> Result<bool, ChainError> {
        self.call(
            pool,
            ISavingsPool::cycleCompletedCall {
                cycle: U256::from(cycle),
            },
        )
        .await
    }

    async fn cycle_contribution_count(&self, pool: Address, cycle: u64) -> Result<u64, ChainError> {
        let count = self
            .call(
                pool,
                ISavingsPool::cycleContributionCountCall {
                    cycle: U256::from(cycle),
                },
            )
            .await?;
        Ok(to_u64(count))
    }
}

#[async_trait]
impl<P: Provider> WhitelistRegistry for ChainGateway<P> {
    async fn client_address(&self) -> Result<Address, ChainError> {
        self.call(self.factory, ISavingsFactory::clientWalletAddressCall {})
            .await
    }

    async fn is_whitelisted(&self, client: Address, pool: Address) -> Result<bool, ChainError> {
        let deposit = self.require_vrf_deposit()?;
        self.call(
            deposit,
            IVrfDeposit::isContractWhitelistedCall {
                clientAddress: client,
                contractAddress: pool,
            },
        )
        .await
    }
}
