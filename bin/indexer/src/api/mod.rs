//! Read-only HTTP API over the projection.

mod routes;
mod server;
mod types;

pub use routes::{
    cycle_contributions, cycles, health, lookup_pool, members, pools, ApiState,
};
pub use server::ApiServer;
pub use types::{ContributionQuery, ErrorResponse, HealthResponse, LookupQuery, PoolQuery};
