//! Savings-pool indexer: follows factory and pool logs and maintains the
//! pools / members / cycles / cycle contributions projection.

pub mod api;
pub mod chain;
pub mod config;
pub mod ingestor;
pub mod registry;
pub mod sync;
