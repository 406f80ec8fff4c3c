//! Indexer configuration, read from the environment.

use std::net::SocketAddr;

use alloy_primitives::Address;
use common::projection::{DEFAULT_SNAPSHOT_PATH, SNAPSHOT_PATH_ENV};

pub const FACTORY_ADDRESS_ENV: &str = "FACTORY_ADDRESS";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const RPC_URL_FALLBACK_ENV: &str = "RPC_URL_FALLBACK";
pub const START_BLOCK_ENV: &str = "START_BLOCK";
pub const POLL_INTERVAL_MS_ENV: &str = "POLL_INTERVAL_MS";
pub const MAX_BLOCK_RANGE_ENV: &str = "MAX_BLOCK_RANGE";
pub const CONFIRMATIONS_ENV: &str = "CONFIRMATIONS";
pub const API_ADDR_ENV: &str = "API_ADDR";

pub const DEFAULT_RPC_URL: &str = "https://rpc.sepolia.mantle.xyz";
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:42069";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} environment variable is required", var),
            ConfigError::Invalid { var, reason } => write!(f, "Invalid {}: {}", var, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub factory_address: Address,
    pub rpc_url: String,
    pub rpc_url_fallback: Option<String>,
    pub start_block: u64,
    pub snapshot_path: String,
    pub poll_interval_ms: u64,
    pub max_block_range: u64,
    pub confirmations: u64,
    pub api_addr: SocketAddr,
}

impl IndexerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let factory_address = lookup(FACTORY_ADDRESS_ENV)
            .ok_or(ConfigError::Missing(FACTORY_ADDRESS_ENV))
            .and_then(|v| parse(FACTORY_ADDRESS_ENV, &v))?;

        let max_block_range: u64 = parse_or(&lookup, MAX_BLOCK_RANGE_ENV, 2_000)?;
        if max_block_range == 0 {
            return Err(ConfigError::Invalid {
                var: MAX_BLOCK_RANGE_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        let poll_interval_ms: u64 = parse_or(&lookup, POLL_INTERVAL_MS_ENV, 3_000)?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: POLL_INTERVAL_MS_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            factory_address,
            rpc_url: lookup(RPC_URL_ENV).unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            rpc_url_fallback: lookup(RPC_URL_FALLBACK_ENV).filter(|v| !v.is_empty()),
            start_block: parse_or(&lookup, START_BLOCK_ENV, 0)?,
            snapshot_path: lookup(SNAPSHOT_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string()),
            poll_interval_ms,
            max_block_range,
            confirmations: parse_or(&lookup, CONFIRMATIONS_ENV, 0)?,
            api_addr: match lookup(API_ADDR_ENV) {
                Some(v) => parse(API_ADDR_ENV, &v)?,
                None => parse(API_ADDR_ENV, DEFAULT_API_ADDR)?,
            },
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => parse(var, &value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_missing_factory_is_error() {
        let err = IndexerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(FACTORY_ADDRESS_ENV));
    }

    #[test]
    fn test_defaults() {
        let config = IndexerConfig::from_lookup(lookup_from(&[(
            FACTORY_ADDRESS_ENV,
            "0x00000000000000000000000000000000000000fa",
        )]))
        .unwrap();

        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.rpc_url_fallback, None);
        assert_eq!(config.start_block, 0);
        assert_eq!(config.poll_interval_ms, 3_000);
        assert_eq!(config.max_block_range, 2_000);
        assert_eq!(config.snapshot_path, DEFAULT_SNAPSHOT_PATH);
        assert_eq!(config.api_addr.port(), 42069);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = IndexerConfig::from_lookup(lookup_from(&[
            (FACTORY_ADDRESS_ENV, "0x00000000000000000000000000000000000000fa"),
            (START_BLOCK_ENV, "latest"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: START_BLOCK_ENV, .. }));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = IndexerConfig::from_lookup(lookup_from(&[
            (FACTORY_ADDRESS_ENV, "0x00000000000000000000000000000000000000fa"),
            (POLL_INTERVAL_MS_ENV, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: POLL_INTERVAL_MS_ENV, .. }));
    }
}
