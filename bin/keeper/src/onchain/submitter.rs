//! Single-signer transaction submitter.
//!
//! Every task shares one signing account, so sends go through a
//! [`SignerGate`]: fetch nonce, send, wait for the receipt, release. The
//! fallback endpoint is only tried while nothing has been broadcast; once a
//! hash exists the attempt either gets its receipt or fails for that pool.

use std::time::Duration;

use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use common::interfaces::pool::ISavingsPool;
use common::interfaces::vrf_deposit::IVrfDeposit;

use super::gate::SignerGate;
use super::types::TxReceipt;
use crate::chain::{ChainError, DrawSubmitter, WhitelistSubmitter};

/// Upper bound on waiting for a receipt while holding the signer.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OnchainSubmitter<P> {
    primary: P,
    fallback: Option<P>,
    signer: Address,
    vrf_deposit: Option<Address>,
    gate: SignerGate,
}

impl<P: Provider> OnchainSubmitter<P> {
    /// `primary` and `fallback` must both carry the signer's wallet.
    pub fn new(primary: P, fallback: Option<P>, signer: Address) -> Self {
        Self {
            primary,
            fallback,
            signer,
            vrf_deposit: None,
            gate: SignerGate::new(),
        }
    }

    pub fn with_vrf_deposit(mut self, vrf_deposit: Address) -> Self {
        self.vrf_deposit = Some(vrf_deposit);
        self
    }

    /// Stop accepting submissions and wait for the in-flight one, if any.
    pub async fn shutdown(&self) {
        self.gate.close().await;
        tracing::info!(signer = %self.signer, "🔒 Signer released");
    }

    async fn submit(&self, to: Address, input: Vec<u8>, label: &str) -> Result<TxReceipt, ChainError> {
        self.gate
            .run(async {
                let pending = match self.broadcast(&self.primary, to, &input).await {
                    Ok(pending) => pending,
                    Err(primary) => match &self.fallback {
                        Some(fallback) if retry_on_fallback(&primary) => {
                            tracing::warn!(
                                "🔄 {} send failed on primary ({}), trying fallback",
                                label,
                                primary
                            );
                            self.broadcast(fallback, to, &input).await?
                        }
                        _ => return Err(primary),
                    },
                };
                self.await_receipt(pending).await
            })
            .await
    }

    /// Nonce read and send. Nothing has reached the mempool if this fails.
    async fn broadcast(
        &self,
        provider: &P,
        to: Address,
        input: &[u8],
    ) -> Result<PendingTransactionBuilder<alloy::network::Ethereum>, ChainError> {
        let nonce = provider
            .get_transaction_count(self.signer)
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))?;

        let tx = TransactionRequest::default()
            .from(self.signer)
            .to(to)
            .input(input.to_vec().into())
            .nonce(nonce);

        let pending_tx = provider
            .send_transaction(tx)
            .await
            .map_err(ChainError::from_send_error)?;

        tracing::debug!(nonce, "Transaction sent: {:?}", pending_tx.tx_hash());
        Ok(pending_tx)
    }

    async fn await_receipt(
        &self,
        pending_tx: PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> Result<TxReceipt, ChainError> {
        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        let receipt = pending_tx
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| ChainError::ReceiptUnavailable {
                tx_hash: tx_hash.clone(),
                reason: e.to_string(),
            })?;

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number.unwrap_or(0),
            gas_used: receipt.gas_used as u128,
            status: receipt.status(),
        })
    }
}

/// Whether a failed broadcast may be repeated on another endpoint. Reverts
/// fail the same way everywhere, and a known hash means the call is already
/// in flight.
fn retry_on_fallback(err: &ChainError) -> bool {
    !matches!(
        err,
        ChainError::Reverted { .. }
            | ChainError::ReceiptUnavailable { .. }
            | ChainError::SubmitterClosed
    )
}

#[async_trait]
impl<P: Provider> DrawSubmitter for OnchainSubmitter<P> {
    async fn trigger_draw(&self, pool: Address) -> Result<TxReceipt, ChainError> {
        let call = ISavingsPool::autoDrawCall {};
        self.submit(pool, call.abi_encode(), "autoDraw").await
    }
}

#[async_trait]
impl<P: Provider> WhitelistSubmitter for OnchainSubmitter<P> {
    async fn add_to_whitelist(
        &self,
        pool: Address,
        callback_gas_price: u128,
        callback_gas_limit: u128,
    ) -> Result<TxReceipt, ChainError> {
        let deposit = self.vrf_deposit.ok_or_else(|| {
            ChainError::InvalidConfig("randomness deposit contract not configured".to_string())
        })?;
        let call = IVrfDeposit::addContractToWhitelistCall {
            contractAddress: pool,
            callbackGasPrice: callback_gas_price,
            callbackGasLimit: callback_gas_limit,
        };
        self.submit(deposit, call.abi_encode(), "addContractToWhitelist")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pre_broadcast_failures_use_fallback() {
        assert!(retry_on_fallback(&ChainError::RpcError("connection refused".into())));
        assert!(!retry_on_fallback(&ChainError::Reverted {
            tx_hash: None,
            reason: "execution reverted".into(),
        }));
        assert!(!retry_on_fallback(&ChainError::ReceiptUnavailable {
            tx_hash: "0xabc".into(),
            reason: "timed out".into(),
        }));
        assert!(!retry_on_fallback(&ChainError::SubmitterClosed));
    }
}
