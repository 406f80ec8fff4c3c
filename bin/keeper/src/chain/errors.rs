//! Error types for chain reads and transaction submission

use alloy_primitives::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    RpcError(String),
    /// Both primary and fallback endpoints failed
    AllEndpointsFailed { primary: String, fallback: String },
    /// A view call returned data that does not match the ABI
    DecodeError { contract: Address, reason: String },
    /// Transaction reverted, either in gas estimation or on chain
    Reverted { tx_hash: Option<String>, reason: String },
    /// Transaction was broadcast but its receipt could not be obtained
    ReceiptUnavailable { tx_hash: String, reason: String },
    /// Signer was released; no further submissions accepted
    SubmitterClosed,
    InvalidConfig(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::RpcError(msg) => write!(f, "RPC error: {}", msg),
            ChainError::AllEndpointsFailed { primary, fallback } => write!(
                f,
                "RPC error on primary ({}) and fallback ({})",
                primary, fallback
            ),
            ChainError::DecodeError { contract, reason } => {
                write!(f, "Failed to decode call result from {}: {}", contract, reason)
            }
            ChainError::Reverted { tx_hash, reason } => match tx_hash {
                Some(hash) => write!(f, "Transaction {} reverted: {}", hash, reason),
                None => write!(f, "Transaction reverted: {}", reason),
            },
            ChainError::ReceiptUnavailable { tx_hash, reason } => {
                write!(f, "No receipt for transaction {}: {}", tx_hash, reason)
            }
            ChainError::SubmitterClosed => write!(f, "Submitter is shut down"),
            ChainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl ChainError {
    /// Classify a transport-level send error. Reverts are final; anything
    /// else may succeed on another endpoint.
    pub fn from_send_error(err: impl std::fmt::Display) -> Self {
        let msg = err.to_string();
        if msg.to_lowercase().contains("revert") {
            ChainError::Reverted {
                tx_hash: None,
                reason: msg,
            }
        } else {
            ChainError::RpcError(msg)
        }
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_error_classification() {
        assert!(ChainError::from_send_error("server returned an error response: execution reverted: Period not ended").is_revert());
        assert!(!ChainError::from_send_error("connection refused").is_revert());
    }
}
