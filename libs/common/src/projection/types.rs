//! Row types of the savings-pool projection.
//!
//! Every row is keyed by a string built from lowercase hex addresses and
//! decimal indices joined with `|`, so keys are stable across restarts and
//! sort by pool first.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Separator used in composite keys.
pub const KEY_SEPARATOR: char = '|';

/// Canonical lowercase `0x`-prefixed form of an address.
pub fn address_key(address: &Address) -> String {
    format!("{:#x}", address)
}

/// Key of a member row: `pool|member`.
pub fn member_key(pool: &Address, member: &Address) -> String {
    format!("{}{}{}", address_key(pool), KEY_SEPARATOR, address_key(member))
}

/// Key of a cycle row: `pool|cycle`.
pub fn cycle_key(pool: &Address, cycle: u64) -> String {
    format!("{}{}{}", address_key(pool), KEY_SEPARATOR, cycle)
}

/// Key of a cycle contribution row: `pool|cycle|member`.
pub fn contribution_key(pool: &Address, cycle: u64, member: &Address) -> String {
    format!(
        "{}{}{}{}{}",
        address_key(pool),
        KEY_SEPARATOR,
        cycle,
        KEY_SEPARATOR,
        address_key(member)
    )
}

/// Prefix shared by every child row of a pool.
pub fn pool_prefix(pool: &str) -> String {
    format!("{}{}", pool.to_lowercase(), KEY_SEPARATOR)
}

/// Clamp an on-chain integer to `u64`. Cycle counters, durations and
/// timestamps never approach the limit in practice.
pub fn to_u64(value: U256) -> u64 {
    value.saturating_to::<u64>()
}

/// Lifecycle of a pool. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PoolState {
    Open,
    Active,
    Completed,
}

impl PoolState {
    /// Decode the `state` field returned by `getPoolInfo`.
    pub fn from_onchain(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Open),
            1 => Some(Self::Active),
            2 => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A savings pool discovered from the factory's `PoolCreated` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Lowercase pool address
    pub id: String,
    pub creator: String,
    pub name: String,
    pub description: String,
    pub max_members: u8,
    pub contribution_per_period: U256,
    /// Seconds per cycle
    pub period_duration: u64,
    /// Percentage of yield paid to the cycle winner
    pub yield_bonus_split: u8,
    pub state: PoolState,
    pub current_cycle: u64,
    pub total_cycles: u64,
    pub cycle_start_time: u64,
    pub created_at_block: u64,
    pub created_at_timestamp: u64,
}

/// A member that joined a pool with its up-front collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// `pool|member`
    pub id: String,
    pub pool_id: String,
    pub address: String,
    /// Collateral deposited on join
    pub contribution: U256,
    pub joined_at_block: u64,
    pub joined_at_timestamp: u64,
}

/// Outcome of a single draw cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// `pool|cycle`
    pub id: String,
    pub pool_id: String,
    pub index: u64,
    pub winner: String,
    pub prize: U256,
    pub yield_bonus: U256,
    pub compounded: U256,
    /// Timestamp of the event that last touched this row
    pub timestamp: u64,
}

/// Per-member payment record for one cycle, either paid or liquidated from
/// collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleContribution {
    /// `pool|cycle|member`
    pub id: String,
    pub pool_id: String,
    pub cycle_index: u64,
    pub member_address: String,
    pub amount: U256,
    pub is_liquidated: bool,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_keys_are_lowercase_and_pipe_joined() {
        let pool = address!("0xAbCdEf0000000000000000000000000000000001");
        let member = address!("0x00000000000000000000000000000000000000Ff");

        assert_eq!(address_key(&pool), "0xabcdef0000000000000000000000000000000001");
        assert_eq!(
            member_key(&pool, &member),
            "0xabcdef0000000000000000000000000000000001|0x00000000000000000000000000000000000000ff"
        );
        assert_eq!(
            cycle_key(&pool, 3),
            "0xabcdef0000000000000000000000000000000001|3"
        );
        assert_eq!(
            contribution_key(&pool, 3, &member),
            "0xabcdef0000000000000000000000000000000001|3|0x00000000000000000000000000000000000000ff"
        );
    }

    #[test]
    fn test_pool_state_from_onchain() {
        assert_eq!(PoolState::from_onchain(0), Some(PoolState::Open));
        assert_eq!(PoolState::from_onchain(1), Some(PoolState::Active));
        assert_eq!(PoolState::from_onchain(2), Some(PoolState::Completed));
        assert_eq!(PoolState::from_onchain(7), None);
        assert!(PoolState::Open < PoolState::Active);
        assert!(PoolState::Active < PoolState::Completed);
    }

    #[test]
    fn test_to_u64_saturates() {
        assert_eq!(to_u64(U256::from(42u64)), 42);
        assert_eq!(to_u64(U256::MAX), u64::MAX);
    }
}
