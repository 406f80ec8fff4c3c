//! Live chain access for the keeper tasks
//!
//! - Read traits over factory, pool and randomness-deposit contracts
//! - `ChainGateway`: eth_call implementation with a fallback endpoint

mod errors;
mod gateway;
mod traits;

pub use errors::ChainError;
pub use gateway::ChainGateway;
pub use traits::{
    DrawSubmitter, PoolDirectory, PoolReader, PoolStatus, WhitelistRegistry, WhitelistSubmitter,
};
