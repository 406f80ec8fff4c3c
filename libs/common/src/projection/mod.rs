//! Relational read model of savings pools built from chain events.

pub mod snapshot;
pub mod store;
pub mod types;

pub use snapshot::{
    ProjectionSnapshot, SnapshotConfig, SnapshotError, SnapshotManager, WatchedContract,
    DEFAULT_SNAPSHOT_PATH, SNAPSHOT_PATH_ENV,
};
pub use store::{ProjectionStats, ProjectionStore, StoreError, Table, WriteOutcome};
pub use types::{
    address_key, contribution_key, cycle_key, member_key, to_u64, Cycle, CycleContribution,
    Member, Pool, PoolState,
};
