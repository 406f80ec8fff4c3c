//! Error types for chain connectivity

#[derive(Debug)]
pub enum ChainError {
    RpcError(String),
    /// Both primary and fallback endpoints failed
    AllEndpointsFailed { primary: String, fallback: String },
    EventParseError { reason: String },
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
            ChainError::EventParseError { reason } => write!(f, "Event parse error: {}", reason),
            ChainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}
