//! Pool lifecycle transitions.
//!
//! `Open -> Active -> Completed`, with the cycle counter advancing while
//! Active. Replays and late duplicates resolve to [`TransitionCheck::AlreadyApplied`]
//! so the projection never moves backwards.

use common::projection::{Pool, PoolState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `PoolStarted`
    Start,
    /// `CycleEnded(cycle)`, moving the pool to `cycle + 1`
    AdvanceCycle { next_cycle: u64 },
    /// `PoolCompleted`
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    Apply,
    /// Target already reached or passed
    AlreadyApplied,
    Illegal { reason: &'static str },
}

pub fn check(pool: &Pool, transition: Transition) -> TransitionCheck {
    match (transition, pool.state) {
        (Transition::Start, PoolState::Open) => TransitionCheck::Apply,
        (Transition::Start, _) => TransitionCheck::AlreadyApplied,

        (Transition::Complete, PoolState::Active) => TransitionCheck::Apply,
        (Transition::Complete, PoolState::Completed) => TransitionCheck::AlreadyApplied,
        (Transition::Complete, PoolState::Open) => TransitionCheck::Illegal {
            reason: "pool completed before it started",
        },

        (Transition::AdvanceCycle { .. }, PoolState::Open) => TransitionCheck::Illegal {
            reason: "cycle ended before pool started",
        },
        (Transition::AdvanceCycle { next_cycle }, _) => {
            if next_cycle <= pool.current_cycle {
                TransitionCheck::AlreadyApplied
            } else if next_cycle > pool.total_cycles {
                TransitionCheck::Illegal {
                    reason: "cycle beyond total cycles",
                }
            } else {
                TransitionCheck::Apply
            }
        }
    }
}
