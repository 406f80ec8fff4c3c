//! Chain connectivity for the indexer
//!
//! - Event types and decoding for factory and pool logs
//! - HTTP log poller with bounded block ranges and a fallback endpoint

mod errors;
mod event_types;
mod log_poller;

pub use errors::ChainError;
pub use event_types::{
    parse_log, EventEnvelope, EventParseError, EventSignatures, LogMeta, LogPosition, PoolEvent,
};
pub use log_poller::{LogPoller, LogPollerConfig};
