//! Keeper configuration, read from the environment.

use std::time::Duration;

use alloy_primitives::Address;

pub const FACTORY_ADDRESS_ENV: &str = "FACTORY_ADDRESS";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const RPC_URL_FALLBACK_ENV: &str = "RPC_URL_FALLBACK";
pub const DEPOSIT_CONTRACT_ENV: &str = "DEPOSIT_CONTRACT";
pub const CLIENT_WALLET_ADDRESS_ENV: &str = "CLIENT_WALLET_ADDRESS";
pub const CALLBACK_GAS_PRICE_ENV: &str = "CALLBACK_GAS_PRICE";
pub const CALLBACK_GAS_LIMIT_ENV: &str = "CALLBACK_GAS_LIMIT";
pub const DRAW_INTERVAL_SECS_ENV: &str = "DRAW_INTERVAL_SECS";
pub const WHITELIST_INTERVAL_SECS_ENV: &str = "WHITELIST_INTERVAL_SECS";
pub const DRAW_TX_DELAY_MS_ENV: &str = "DRAW_TX_DELAY_MS";
pub const WHITELIST_TX_DELAY_MS_ENV: &str = "WHITELIST_TX_DELAY_MS";

pub const DEFAULT_RPC_URL: &str = "https://rpc.sepolia.mantle.xyz";

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

#[derive(Clone)]
pub struct KeeperConfig {
    pub factory_address: Address,
    /// 0x-prefixed hex, 32 bytes
    pub private_key: String,
    pub rpc_url: String,
    pub rpc_url_fallback: Option<String>,
    /// Randomness deposit contract; only the whitelist task needs it
    pub deposit_contract: Option<Address>,
    pub client_wallet_address: Option<Address>,
    pub callback_gas_price: u128,
    pub callback_gas_limit: u128,
    pub draw_interval: Duration,
    pub whitelist_interval: Duration,
    pub draw_tx_delay: Duration,
    pub whitelist_tx_delay: Duration,
}

// Keeps the key out of logs.
impl std::fmt::Debug for KeeperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeeperConfig")
            .field("factory_address", &self.factory_address)
            .field("private_key", &"<redacted>")
            .field("rpc_url", &self.rpc_url)
            .field("rpc_url_fallback", &self.rpc_url_fallback)
            .field("deposit_contract", &self.deposit_contract)
            .field("client_wallet_address", &self.client_wallet_address)
            .field("callback_gas_price", &self.callback_gas_price)
            .field("callback_gas_limit", &self.callback_gas_limit)
            .field("draw_interval", &self.draw_interval)
            .field("whitelist_interval", &self.whitelist_interval)
            .field("draw_tx_delay", &self.draw_tx_delay)
            .field("whitelist_tx_delay", &self.whitelist_tx_delay)
            .finish()
    }
}

impl KeeperConfig {
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

        let private_key = lookup(PRIVATE_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(PRIVATE_KEY_ENV))?;
        let private_key = validate_private_key(private_key.trim())?;

        Ok(Self {
            factory_address,
            private_key,
            rpc_url: lookup(RPC_URL_ENV).unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            rpc_url_fallback: lookup(RPC_URL_FALLBACK_ENV).filter(|v| !v.is_empty()),
            deposit_contract: parse_optional(&lookup, DEPOSIT_CONTRACT_ENV)?,
            client_wallet_address: parse_optional(&lookup, CLIENT_WALLET_ADDRESS_ENV)?,
            callback_gas_price: parse_or(&lookup, CALLBACK_GAS_PRICE_ENV, 1_000_000_000)?,
            callback_gas_limit: parse_or(&lookup, CALLBACK_GAS_LIMIT_ENV, 8_000_000_000)?,
            draw_interval: Duration::from_secs(parse_positive(&lookup, DRAW_INTERVAL_SECS_ENV, 60)?),
            whitelist_interval: Duration::from_secs(parse_positive(
                &lookup,
                WHITELIST_INTERVAL_SECS_ENV,
                30,
            )?),
            draw_tx_delay: Duration::from_millis(parse_or(&lookup, DRAW_TX_DELAY_MS_ENV, 2_000)?),
            whitelist_tx_delay: Duration::from_millis(parse_or(
                &lookup,
                WHITELIST_TX_DELAY_MS_ENV,
                1_000,
            )?),
        })
    }

    pub fn require_deposit_contract(&self) -> Result<Address, ConfigError> {
        self.deposit_contract
            .ok_or(ConfigError::Missing(DEPOSIT_CONTRACT_ENV))
    }
}

fn validate_private_key(key: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: PRIVATE_KEY_ENV,
        reason: reason.to_string(),
    };

    let digits = key
        .strip_prefix("0x")
        .ok_or_else(|| invalid("must start with 0x"))?;
    if digits.len() != 64 {
        return Err(invalid("must be 32 bytes (64 hex digits)"));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("must be hex"));
    }
    Ok(key.to_string())
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

/// Intervals feed `tokio::time::interval`, which rejects a zero period.
fn parse_positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, var, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn parse_optional<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(value) => parse(var, &value).map(Some),
        None => Ok(None),
    }
}
