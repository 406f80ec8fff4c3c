use super::routes::{cycle_contributions, cycles, health, lookup_pool, members, pools, ApiState};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

pub struct ApiServer {
    state: ApiState,
    addr: SocketAddr,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(state: ApiState, addr: SocketAddr, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            addr,
            cancel_token,
        }
    }

    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/pools", get(pools))
            .route("/pools/lookup", get(lookup_pool))
            .route("/members", get(members))
            .route("/cycles", get(cycles))
            .route("/cycle-contributions", get(cycle_contributions))
            .with_state(state)
    }

    pub async fn start(self) -> eyre::Result<()> {
        let app = Self::router(self.state);

        tracing::info!("🌐 API server listening on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                self.cancel_token.cancelled().await;
            })
            .await?;

        Ok(())
    }
}
