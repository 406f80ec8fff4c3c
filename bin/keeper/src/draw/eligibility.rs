//! When a pool may be drawn.
//!
//! The schedule gate is pure: it only looks at the pool counters and the
//! wall clock. Pending randomness and cycle completion need extra reads and
//! are checked by the scheduler afterwards.

use std::fmt;

use alloy_primitives::U256;
use common::projection::PoolState;

use crate::chain::PoolStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotActive { state: u8 },
    PeriodNotEnded { remaining_secs: u64 },
    DrawPending { nonce: U256 },
    CycleCompleted { cycle: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotActive { state } => match PoolState::from_onchain(*state) {
                Some(state) => write!(f, "Pool is not active ({})", state),
                None => write!(f, "Pool is not active (state {})", state),
            },
            SkipReason::PeriodNotEnded { remaining_secs } => {
                let hours = remaining_secs / 3_600;
                let minutes = (remaining_secs % 3_600) / 60;
                write!(f, "Period not ended yet ({}h {}m remaining)", hours, minutes)
            }
            SkipReason::DrawPending { nonce } => write!(f, "Draw already pending (nonce {})", nonce),
            SkipReason::CycleCompleted { cycle } => write!(f, "Cycle {} already completed", cycle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawDecision {
    Trigger {
        cycle: u64,
        /// Members that paid this cycle, when the count could be read
        contributed: Option<u64>,
    },
    Skip(SkipReason),
}

/// State and timing checks. `now` is unix seconds.
pub fn schedule_gate(status: &PoolStatus, now: u64) -> Result<(), SkipReason> {
    if status.state() != Some(PoolState::Active) {
        return Err(SkipReason::NotActive {
            state: status.state,
        });
    }

    let period_end = status.period_end();
    if now < period_end {
        return Err(SkipReason::PeriodNotEnded {
            remaining_secs: period_end - now,
        });
    }

    Ok(())
}
