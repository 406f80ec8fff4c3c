//! Event ingestor
//!
//! Applies decoded events to the projection one at a time, in chain order.
//! Every handler is insert-if-absent or an update keyed by a deterministic
//! id, so a replayed block range converges to the same state.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use common::projection::{
    address_key, contribution_key, cycle_key, member_key, to_u64, Cycle, CycleContribution,
    Member, Pool, PoolState, ProjectionStore, StoreError, WriteOutcome,
};
use parking_lot::RwLock;

use super::lifecycle::{self, Transition, TransitionCheck};
use crate::chain::{EventEnvelope, LogPosition, PoolEvent};
use crate::registry::{ContractRegistry, SourceKind};

/// Reasons an event is rejected. None of these stop the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    UnknownSource { source: Address },
    BeforeCreation { source: Address, created_at: LogPosition },
    UnexpectedSource { source: Address, event: &'static str },
    Inconsistent(StoreError),
    IllegalTransition { pool: String, event: &'static str, reason: &'static str },
    MembershipFull { pool: String, max_members: u8 },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::UnknownSource { source } => {
                write!(f, "Log from unwatched address {}", source)
            }
            IngestError::BeforeCreation { source, created_at } => write!(
                f,
                "Log from {} precedes its creation at {}",
                source, created_at
            ),
            IngestError::UnexpectedSource { source, event } => {
                write!(f, "{} is not expected from {}", event, source)
            }
            IngestError::Inconsistent(e) => write!(f, "Projection inconsistency: {}", e),
            IngestError::IllegalTransition { pool, event, reason } => {
                write!(f, "{} on pool {} rejected: {}", event, pool, reason)
            }
            IngestError::MembershipFull { pool, max_members } => {
                write!(f, "Pool {} already has {} members", pool, max_members)
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::Inconsistent(err)
    }
}

/// Counters for one batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.skipped
    }

    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Inserted => self.inserted += 1,
            WriteOutcome::Updated => self.updated += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl std::fmt::Display for BatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} events: {} inserted, {} updated, {} unchanged, {} skipped",
            self.total(),
            self.inserted,
            self.updated,
            self.unchanged,
            self.skipped
        )
    }
}

pub struct Ingestor {
    registry: Arc<ContractRegistry>,
    store: Arc<RwLock<ProjectionStore>>,
}

impl Ingestor {
    pub fn new(registry: Arc<ContractRegistry>, store: Arc<RwLock<ProjectionStore>>) -> Self {
        Self { registry, store }
    }

    pub fn store(&self) -> Arc<RwLock<ProjectionStore>> {
        self.store.clone()
    }

    /// Apply events in order, logging and skipping the ones that are
    /// rejected.
    pub fn ingest_batch(&self, envelopes: &[EventEnvelope]) -> BatchStats {
        let mut stats = BatchStats::default();
        for envelope in envelopes {
            match self.apply(envelope) {
                Ok(outcome) => {
                    tracing::debug!(
                        event = envelope.event.name(),
                        source = %envelope.source,
                        block = envelope.block_number,
                        log_index = envelope.log_index,
                        ?outcome,
                        "Applied event"
                    );
                    stats.record(outcome);
                }
                Err(e) => {
                    tracing::warn!(
                        event = envelope.event.name(),
                        block = envelope.block_number,
                        log_index = envelope.log_index,
                        tx = %envelope.tx_hash,
                        "⚠️ Skipping event: {}",
                        e
                    );
                    stats.skipped += 1;
                }
            }
        }
        stats
    }

    /// Apply a single event.
    pub fn apply(&self, envelope: &EventEnvelope) -> Result<WriteOutcome, IngestError> {
        let source = envelope.source;
        match self.registry.classify(source, envelope.position()) {
            SourceKind::Unknown => return Err(IngestError::UnknownSource { source }),
            SourceKind::BeforeCreation { created_at } => {
                return Err(IngestError::BeforeCreation { source, created_at })
            }
            SourceKind::Factory if !envelope.event.is_factory_event() => {
                return Err(IngestError::UnexpectedSource {
                    source,
                    event: envelope.event.name(),
                })
            }
            SourceKind::Pool if envelope.event.is_factory_event() => {
                return Err(IngestError::UnexpectedSource {
                    source,
                    event: envelope.event.name(),
                })
            }
            SourceKind::Factory | SourceKind::Pool => {}
        }

        let pool_id = address_key(&source);
        let timestamp = envelope.block_timestamp;
        let mut store = self.store.write();

        match &envelope.event {
            PoolEvent::PoolCreated {
                pool,
                creator,
                max_members,
                contribution_per_period,
                period_duration,
                yield_bonus_split,
                name,
                description,
            } => {
                if self.registry.add_pool(*pool, envelope.position()) {
                    tracing::info!(pool = %pool, name = %name, "🆕 Watching new pool");
                }
                Ok(store.insert_pool(Pool {
                    id: address_key(pool),
                    creator: address_key(creator),
                    name: name.clone(),
                    description: description.clone(),
                    max_members: *max_members,
                    contribution_per_period: *contribution_per_period,
                    period_duration: to_u64(*period_duration),
                    yield_bonus_split: *yield_bonus_split,
                    state: PoolState::Open,
                    current_cycle: 0,
                    total_cycles: u64::from(*max_members),
                    cycle_start_time: 0,
                    created_at_block: envelope.block_number,
                    created_at_timestamp: timestamp,
                }))
            }

            PoolEvent::Joined {
                member,
                contribution,
            } => {
                let max_members = existing_pool(&store, &pool_id)?.max_members;
                let key = member_key(&source, member);
                if store.member(&key).is_some() {
                    return Ok(WriteOutcome::Unchanged);
                }
                if store.member_count(&pool_id) >= usize::from(max_members) {
                    return Err(IngestError::MembershipFull {
                        pool: pool_id,
                        max_members,
                    });
                }
                Ok(store.insert_member(Member {
                    id: key,
                    pool_id,
                    address: address_key(member),
                    contribution: *contribution,
                    joined_at_block: envelope.block_number,
                    joined_at_timestamp: timestamp,
                }))
            }

            PoolEvent::PoolStarted {
                start_time,
                total_cycles,
            } => {
                let pool = existing_pool(&store, &pool_id)?;
                match lifecycle::check(pool, Transition::Start) {
                    TransitionCheck::Apply => {}
                    TransitionCheck::AlreadyApplied => return Ok(WriteOutcome::Unchanged),
                    TransitionCheck::Illegal { reason } => {
                        return Err(illegal(pool_id, envelope, reason))
                    }
                }
                let (start_time, total_cycles) = (to_u64(*start_time), to_u64(*total_cycles));
                let outcome = store.update_pool(&pool_id, |p| {
                    p.state = PoolState::Active;
                    p.current_cycle = 0;
                    p.total_cycles = total_cycles;
                    p.cycle_start_time = start_time;
                })?;
                tracing::info!(pool = %pool_id, total_cycles, start_time, "▶️ Pool started");
                Ok(outcome)
            }

            PoolEvent::Contributed {
                cycle,
                member,
                amount,
            } => {
                existing_pool(&store, &pool_id)?;
                Ok(insert_contribution(&mut store, &source, *cycle, member, *amount, false, timestamp))
            }

            PoolEvent::CollateralLiquidated {
                cycle,
                member,
                amount,
            } => {
                existing_pool(&store, &pool_id)?;
                tracing::info!(pool = %pool_id, member = %member, cycle = %cycle, "💸 Collateral liquidated");
                Ok(insert_contribution(&mut store, &source, *cycle, member, *amount, true, timestamp))
            }

            PoolEvent::WinnerSelected {
                cycle,
                winner,
                prize,
            } => {
                existing_pool(&store, &pool_id)?;
                let index = to_u64(*cycle);
                Ok(store.insert_cycle(Cycle {
                    id: cycle_key(&source, index),
                    pool_id,
                    index,
                    winner: address_key(winner),
                    prize: *prize,
                    yield_bonus: U256::ZERO,
                    compounded: U256::ZERO,
                    timestamp,
                }))
            }

            PoolEvent::YieldDistributed {
                cycle,
                winner,
                yield_bonus,
                compounded,
            } => {
                let key = cycle_key(&source, to_u64(*cycle));
                let prize = yield_bonus.saturating_add(*compounded);
                if let Some(existing) = store.cycle(&key) {
                    if existing.prize != prize {
                        tracing::debug!(
                            cycle = %key,
                            winner = %winner,
                            selected_prize = %existing.prize,
                            distributed = %prize,
                            "Prize replaced by yield bonus plus compounded amount"
                        );
                    }
                }
                Ok(store.update_cycle(&key, |c| {
                    c.yield_bonus = *yield_bonus;
                    c.compounded = *compounded;
                    c.prize = prize;
                    c.timestamp = timestamp;
                })?)
            }

            PoolEvent::CycleEnded { cycle } => {
                let next_cycle = to_u64(*cycle).saturating_add(1);
                let pool = existing_pool(&store, &pool_id)?;
                match lifecycle::check(pool, Transition::AdvanceCycle { next_cycle }) {
                    TransitionCheck::Apply => {}
                    TransitionCheck::AlreadyApplied => return Ok(WriteOutcome::Unchanged),
                    TransitionCheck::Illegal { reason } => {
                        return Err(illegal(pool_id, envelope, reason))
                    }
                }
                let outcome = store.update_pool(&pool_id, |p| {
                    p.current_cycle = next_cycle;
                    p.cycle_start_time = timestamp;
                })?;
                tracing::info!(pool = %pool_id, current_cycle = next_cycle, "🔁 Cycle ended");
                Ok(outcome)
            }

            PoolEvent::PoolCompleted => {
                let pool = existing_pool(&store, &pool_id)?;
                match lifecycle::check(pool, Transition::Complete) {
                    TransitionCheck::Apply => {}
                    TransitionCheck::AlreadyApplied => return Ok(WriteOutcome::Unchanged),
                    TransitionCheck::Illegal { reason } => {
                        return Err(illegal(pool_id, envelope, reason))
                    }
                }
                let outcome = store.update_pool(&pool_id, |p| p.state = PoolState::Completed)?;
                tracing::info!(pool = %pool_id, "🏁 Pool completed");
                Ok(outcome)
            }
        }
    }
}

fn existing_pool<'a>(store: &'a ProjectionStore, pool_id: &str) -> Result<&'a Pool, IngestError> {
    store.pool(pool_id).ok_or_else(|| {
        IngestError::Inconsistent(StoreError::MissingRow {
            table: common::projection::Table::Pools,
            key: pool_id.to_string(),
        })
    })
}

fn illegal(pool: String, envelope: &EventEnvelope, reason: &'static str) -> IngestError {
    IngestError::IllegalTransition {
        pool,
        event: envelope.event.name(),
        reason,
    }
}

fn insert_contribution(
    store: &mut ProjectionStore,
    pool: &Address,
    cycle: U256,
    member: &Address,
    amount: U256,
    is_liquidated: bool,
    timestamp: u64,
) -> WriteOutcome {
    let cycle_index = to_u64(cycle);
    store.insert_contribution(CycleContribution {
        id: contribution_key(pool, cycle_index, member),
        pool_id: address_key(pool),
        cycle_index,
        member_address: address_key(member),
        amount,
        is_liquidated,
        timestamp,
    })
}
