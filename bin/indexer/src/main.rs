use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder};
use clap::Parser;
use common::projection::{SnapshotConfig, SnapshotManager};
use eyre::Result;
use parking_lot::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use indexer::api::{ApiServer, ApiState};
use indexer::chain::{LogPoller, LogPollerConfig};
use indexer::config::IndexerConfig;
use indexer::registry::ContractRegistry;
use indexer::sync::{IndexerService, SyncConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Do not serve the read API
    #[arg(long)]
    no_api: bool,

    /// Sync up to the current head once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting savings pool indexer");

    let config = IndexerConfig::from_env()?;
    tracing::info!(
        factory = %config.factory_address,
        rpc = %config.rpc_url,
        fallback = ?config.rpc_url_fallback,
        snapshot = %config.snapshot_path,
        "Config loaded"
    );

    let primary = ProviderBuilder::new().connect_http(config.rpc_url.parse()?);
    let fallback = match &config.rpc_url_fallback {
        Some(url) => Some(ProviderBuilder::new().connect_http(url.parse()?)),
        None => None,
    };

    match primary.get_chain_id().await {
        Ok(chain_id) => tracing::info!(chain_id, "Connected to RPC"),
        Err(e) => tracing::warn!("Primary RPC unreachable at startup: {}", e),
    }

    let snapshots = SnapshotManager::new(SnapshotConfig::new(config.snapshot_path.clone()));
    let snapshot = snapshots.load()?;
    let registry = Arc::new(ContractRegistry::from_watched(
        config.factory_address,
        &snapshot.watched,
    ));
    let store = Arc::new(RwLock::new(snapshot.projection));
    tracing::info!(
        last_synced_block = ?snapshot.last_synced_block,
        pools = registry.pool_count(),
        "Snapshot loaded"
    );

    let poller = LogPoller::new(
        primary,
        fallback,
        LogPollerConfig {
            max_block_range: config.max_block_range,
            confirmations: config.confirmations,
        },
    );
    let service = Arc::new(IndexerService::resume(
        poller,
        registry.clone(),
        store.clone(),
        snapshots,
        snapshot.last_synced_block,
        SyncConfig {
            start_block: config.start_block,
            poll_interval_ms: config.poll_interval_ms,
        },
    ));

    if cli.once {
        let report = service.sync_once().await?;
        tracing::info!("✅ Synced {}", report);
        return Ok(());
    }

    let cancel_token = service.cancel_token();

    let api_handle = if cli.no_api {
        None
    } else {
        let server = ApiServer::new(
            ApiState {
                store: store.clone(),
                registry: registry.clone(),
            },
            config.api_addr,
            cancel_token.clone(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = server.start().await {
                tracing::error!("API server failed: {:?}", e);
            }
        }))
    };

    let sync_handle = tokio::spawn(service.clone().run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    cancel_token.cancel();

    if let Err(e) = sync_handle.await? {
        tracing::error!("Indexer stopped with error: {}", e);
    }
    if let Some(handle) = api_handle {
        handle.await?;
    }

    tracing::info!(next_block = service.next_block(), "Indexer stopped");
    Ok(())
}
