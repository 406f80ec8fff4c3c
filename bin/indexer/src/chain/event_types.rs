//! Event types for factory and pool contract logs
//!
//! The factory emits `PoolCreated`; every pool emits its own lifecycle
//! events. Logs are decoded into [`PoolEvent`] and wrapped with their chain
//! position in an [`EventEnvelope`].

use alloy_primitives::{Address, Log as PrimitiveLog, B256, U256};
use alloy_sol_types::SolEvent;

use common::interfaces::factory::ISavingsFactory::PoolCreated;
use common::interfaces::pool::ISavingsPool::{
    CollateralLiquidated, Contributed, CycleEnded, Joined, PoolCompleted, PoolStarted,
    WinnerSelected, YieldDistributed,
};

/// Position of a log in the canonical chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl std::fmt::Display for LogPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

/// Chain metadata attached to a raw log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMeta {
    pub block_number: u64,
    pub log_index: u64,
    pub block_timestamp: u64,
    pub tx_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    PoolCreated {
        pool: Address,
        creator: Address,
        max_members: u8,
        contribution_per_period: U256,
        period_duration: U256,
        yield_bonus_split: u8,
        name: String,
        description: String,
    },
    Joined {
        member: Address,
        contribution: U256,
    },
    PoolStarted {
        start_time: U256,
        total_cycles: U256,
    },
    Contributed {
        cycle: U256,
        member: Address,
        amount: U256,
    },
    CollateralLiquidated {
        cycle: U256,
        member: Address,
        amount: U256,
    },
    WinnerSelected {
        cycle: U256,
        winner: Address,
        prize: U256,
    },
    YieldDistributed {
        cycle: U256,
        winner: Address,
        yield_bonus: U256,
        compounded: U256,
    },
    CycleEnded {
        cycle: U256,
    },
    PoolCompleted,
}

impl PoolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PoolEvent::PoolCreated { .. } => "PoolCreated",
            PoolEvent::Joined { .. } => "Joined",
            PoolEvent::PoolStarted { .. } => "PoolStarted",
            PoolEvent::Contributed { .. } => "Contributed",
            PoolEvent::CollateralLiquidated { .. } => "CollateralLiquidated",
            PoolEvent::WinnerSelected { .. } => "WinnerSelected",
            PoolEvent::YieldDistributed { .. } => "YieldDistributed",
            PoolEvent::CycleEnded { .. } => "CycleEnded",
            PoolEvent::PoolCompleted => "PoolCompleted",
        }
    }

    /// Factory events are the only ones that may come from the factory
    /// address; everything else comes from a pool.
    pub fn is_factory_event(&self) -> bool {
        matches!(self, PoolEvent::PoolCreated { .. })
    }
}

/// A decoded event with the chain context needed to apply it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Address of the emitting contract
    pub source: Address,
    pub block_number: u64,
    pub log_index: u64,
    pub block_timestamp: u64,
    pub tx_hash: B256,
    pub event: PoolEvent,
}

impl EventEnvelope {
    pub fn position(&self) -> LogPosition {
        LogPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }
}

/// Event signatures for log filters
pub struct EventSignatures;

impl EventSignatures {
    pub fn pool_created() -> B256 {
        PoolCreated::SIGNATURE_HASH
    }

    /// Signatures emitted by the factory
    pub fn factory() -> Vec<B256> {
        vec![Self::pool_created()]
    }

    /// Signatures emitted by pool contracts
    pub fn pool() -> Vec<B256> {
        vec![
            Joined::SIGNATURE_HASH,
            PoolStarted::SIGNATURE_HASH,
            Contributed::SIGNATURE_HASH,
            CollateralLiquidated::SIGNATURE_HASH,
            WinnerSelected::SIGNATURE_HASH,
            YieldDistributed::SIGNATURE_HASH,
            CycleEnded::SIGNATURE_HASH,
            PoolCompleted::SIGNATURE_HASH,
        ]
    }

    pub fn all() -> Vec<B256> {
        let mut all = Self::factory();
        all.extend(Self::pool());
        all
    }
}

fn decode<E: SolEvent>(log: &PrimitiveLog) -> Result<E, EventParseError> {
    E::decode_log(log)
        .map(|decoded| decoded.data)
        .map_err(|e| EventParseError::DecodeError(e.to_string()))
}

/// Parse a raw log into an [`EventEnvelope`].
pub fn parse_log(log: &PrimitiveLog, meta: LogMeta) -> Result<EventEnvelope, EventParseError> {
    let topic0 = *log.topics().first().ok_or(EventParseError::NoTopics)?;

    let event = if topic0 == PoolCreated::SIGNATURE_HASH {
        let e: PoolCreated = decode(log)?;
        PoolEvent::PoolCreated {
            pool: e.pool,
            creator: e.creator,
            max_members: e.maxMembers,
            contribution_per_period: e.contributionPerPeriod,
            period_duration: e.periodDuration,
            yield_bonus_split: e.yieldBonusSplit,
            name: e.poolName,
            description: e.poolDescription,
        }
    } else if topic0 == Joined::SIGNATURE_HASH {
        let e: Joined = decode(log)?;
        PoolEvent::Joined {
            member: e.member,
            contribution: e.contribution,
        }
    } else if topic0 == PoolStarted::SIGNATURE_HASH {
        let e: PoolStarted = decode(log)?;
        PoolEvent::PoolStarted {
            start_time: e.startTime,
            total_cycles: e.totalCycles,
        }
    } else if topic0 == Contributed::SIGNATURE_HASH {
        let e: Contributed = decode(log)?;
        PoolEvent::Contributed {
            cycle: e.cycle,
            member: e.member,
            amount: e.amount,
        }
    } else if topic0 == CollateralLiquidated::SIGNATURE_HASH {
        let e: CollateralLiquidated = decode(log)?;
        PoolEvent::CollateralLiquidated {
            cycle: e.cycle,
            member: e.member,
            amount: e.amount,
        }
    } else if topic0 == WinnerSelected::SIGNATURE_HASH {
        let e: WinnerSelected = decode(log)?;
        PoolEvent::WinnerSelected {
            cycle: e.cycle,
            winner: e.winner,
            prize: e.prize,
        }
    } else if topic0 == YieldDistributed::SIGNATURE_HASH {
        let e: YieldDistributed = decode(log)?;
        PoolEvent::YieldDistributed {
            cycle: e.cycle,
            winner: e.winner,
            yield_bonus: e.yieldBonus,
            compounded: e.compounded,
        }
    } else if topic0 == CycleEnded::SIGNATURE_HASH {
        let e: CycleEnded = decode(log)?;
        PoolEvent::CycleEnded { cycle: e.cycle }
    } else if topic0 == PoolCompleted::SIGNATURE_HASH {
        let _: PoolCompleted = decode(log)?;
        PoolEvent::PoolCompleted
    } else {
        return Err(EventParseError::UnknownSignature(topic0));
    };

    Ok(EventEnvelope {
        source: log.address,
        block_number: meta.block_number,
        log_index: meta.log_index,
        block_timestamp: meta.block_timestamp,
        tx_hash: meta.tx_hash,
        event,
    })
}

/// Errors that can occur during event parsing
#[derive(Debug, Clone)]
pub enum EventParseError {
    /// Log has no topics
    NoTopics,
    /// Failed to decode event data
    DecodeError(String),
    /// Unknown event signature
    UnknownSignature(B256),
}

impl std::fmt::Display for EventParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventParseError::NoTopics => write!(f, "Log has no topics"),
            EventParseError::DecodeError(msg) => write!(f, "Failed to decode event: {}", msg),
            EventParseError::UnknownSignature(sig) => {
                write!(f, "Unknown event signature: {}", sig)
            }
        }
    }
}

impl std::error::Error for EventParseError {}
