use common::projection::ProjectionStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub watched_pools: usize,
    pub projection: ProjectionStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// `?id=<pool address>`
#[derive(Debug, Clone, Deserialize)]
pub struct LookupQuery {
    pub id: String,
}

/// `?pool=<pool address>`
#[derive(Debug, Clone, Deserialize)]
pub struct PoolQuery {
    pub pool: String,
}

/// `?pool=<pool address>&cycle=<index>`
#[derive(Debug, Clone, Deserialize)]
pub struct ContributionQuery {
    pub pool: String,
    pub cycle: Option<u64>,
}
