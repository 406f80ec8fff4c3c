use super::types::{ContributionQuery, ErrorResponse, HealthResponse, LookupQuery, PoolQuery};
use crate::registry::ContractRegistry;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use common::projection::{Cycle, CycleContribution, Member, Pool, ProjectionStore};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<RwLock<ProjectionStore>>,
    pub registry: Arc<ContractRegistry>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn pool_key(raw: &str) -> Result<String, ApiError> {
    let key = raw.trim().to_lowercase();
    let valid = key.len() == 42
        && key.starts_with("0x")
        && key[2..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(key)
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("Invalid pool address: {}", raw))),
        ))
    }
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        watched_pools: state.registry.pool_count(),
        projection: state.store.read().stats(),
    })
}

pub async fn pools(State(state): State<ApiState>) -> Json<Vec<Pool>> {
    Json(state.store.read().pools().cloned().collect())
}

pub async fn lookup_pool(
    State(state): State<ApiState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Pool>, ApiError> {
    let key = pool_key(&query.id)?;
    state
        .store
        .read()
        .pool(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Pool not found: {}", key))),
            )
        })
}

pub async fn members(
    State(state): State<ApiState>,
    Query(query): Query<PoolQuery>,
) -> Result<Json<Vec<Member>>, ApiError> {
    let key = pool_key(&query.pool)?;
    let store = state.store.read();
    Ok(Json(store.members_of(&key).into_iter().cloned().collect()))
}

pub async fn cycles(
    State(state): State<ApiState>,
    Query(query): Query<PoolQuery>,
) -> Result<Json<Vec<Cycle>>, ApiError> {
    let key = pool_key(&query.pool)?;
    let store = state.store.read();
    Ok(Json(store.cycles_of(&key).into_iter().cloned().collect()))
}

pub async fn cycle_contributions(
    State(state): State<ApiState>,
    Query(query): Query<ContributionQuery>,
) -> Result<Json<Vec<CycleContribution>>, ApiError> {
    let key = pool_key(&query.pool)?;
    let store = state.store.read();
    Ok(Json(
        store
            .contributions_of(&key, query.cycle)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};
    use common::projection::{address_key, member_key, PoolState};

    fn state_with_pool(pool: Address) -> ApiState {
        let mut store = ProjectionStore::new();
        store.insert_pool(Pool {
            id: address_key(&pool),
            creator: address_key(&Address::repeat_byte(0xc0)),
            name: "Office".into(),
            description: String::new(),
            max_members: 3,
            contribution_per_period: U256::from(5u64),
            period_duration: 60,
            yield_bonus_split: 0,
            state: PoolState::Open,
            current_cycle: 0,
            total_cycles: 3,
            cycle_start_time: 0,
            created_at_block: 1,
            created_at_timestamp: 1,
        });
        let member = Address::repeat_byte(0xa1);
        store.insert_member(Member {
            id: member_key(&pool, &member),
            pool_id: address_key(&pool),
            address: address_key(&member),
            contribution: U256::from(15u64),
            joined_at_block: 2,
            joined_at_timestamp: 2,
        });
        ApiState {
            store: Arc::new(RwLock::new(store)),
            registry: Arc::new(ContractRegistry::new(Address::repeat_byte(0xfa))),
        }
    }

    #[tokio::test]
    async fn test_lookup_accepts_mixed_case() {
        let pool = Address::repeat_byte(0xab);
        let state = state_with_pool(pool);

        let Json(found) = lookup_pool(
            State(state),
            Query(LookupQuery {
                id: "0xABABABABABABABABABABABABABABABABABABABAB".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(found.name, "Office");
    }

    #[tokio::test]
    async fn test_lookup_missing_is_not_found() {
        let state = state_with_pool(Address::repeat_byte(0xab));
        let err = lookup_pool(
            State(state),
            Query(LookupQuery {
                id: address_key(&Address::repeat_byte(0xcd)),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_members_rejects_bad_address() {
        let state = state_with_pool(Address::repeat_byte(0xab));
        let err = members(State(state), Query(PoolQuery { pool: "pool-1".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_members_and_health() {
        let pool = Address::repeat_byte(0xab);
        let state = state_with_pool(pool);

        let Json(rows) = members(
            State(state.clone()),
            Query(PoolQuery {
                pool: address_key(&pool),
            }),
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);

        let Json(health) = health(State(state)).await;
        assert_eq!(health.projection.pools, 1);
        assert_eq!(health.projection.members, 1);
    }
}
