use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use clap::{Parser, ValueEnum};
use eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod chain;
mod config;
mod draw;
mod keeper;
mod onchain;
mod whitelist;

use chain::ChainGateway;
use config::KeeperConfig;
use draw::{DrawScheduler, DrawSchedulerConfig};
use keeper::{KeeperLoop, KeeperLoopConfig, PeriodicTask, RunMode};
use onchain::OnchainSubmitter;
use whitelist::{WhitelistSentinel, WhitelistSentinelConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    Draw,
    Whitelist,
    All,
}

impl Task {
    fn draw(self) -> bool {
        matches!(self, Task::Draw | Task::All)
    }

    fn whitelist(self) -> bool {
        matches!(self, Task::Whitelist | Task::All)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run a single pass and exit (default)
    #[arg(short, long)]
    once: bool,

    /// Keep running on a fixed interval until interrupted
    #[arg(short, long, conflicts_with = "once")]
    watch: bool,

    /// Which periodic task to run
    #[arg(long, value_enum, default_value = "all")]
    task: Task,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
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

    tracing::info!("Starting savings pool keeper");

    let config = KeeperConfig::from_env()?;
    let deposit_contract = if cli.task.whitelist() {
        Some(config.require_deposit_contract()?)
    } else {
        config.deposit_contract
    };

    let signer: PrivateKeySigner = config.private_key.parse()?;
    let signer_address = signer.address();
    let wallet = EthereumWallet::from(signer);

    tracing::info!(
        factory = %config.factory_address,
        signer = %signer_address,
        rpc = %config.rpc_url,
        fallback = ?config.rpc_url_fallback,
        deposit = ?deposit_contract,
        task = ?cli.task,
        "Config loaded"
    );

    let primary = ProviderBuilder::new()
        .wallet(wallet.clone())
        .connect_http(config.rpc_url.parse()?);
    let fallback = match &config.rpc_url_fallback {
        Some(url) => Some(
            ProviderBuilder::new()
                .wallet(wallet.clone())
                .connect_http(url.parse()?),
        ),
        None => None,
    };

    let mut gateway = ChainGateway::new(primary.clone(), fallback.clone(), config.factory_address);
    let mut submitter = OnchainSubmitter::new(primary, fallback, signer_address);
    if let Some(deposit) = deposit_contract {
        gateway = gateway.with_vrf_deposit(deposit);
        submitter = submitter.with_vrf_deposit(deposit);
    }
    let gateway = Arc::new(gateway);
    let submitter = Arc::new(submitter);

    match gateway.ping().await {
        Ok(block) => tracing::info!(block, "Connected to RPC"),
        Err(e) => tracing::warn!("Primary RPC unreachable at startup: {}", e),
    }

    let cancel_token = CancellationToken::new();

    let draw_loop = cli.task.draw().then(|| {
        let scheduler = DrawScheduler::new(
            gateway.clone(),
            submitter.clone(),
            DrawSchedulerConfig {
                tx_delay: config.draw_tx_delay,
            },
        );
        Arc::new(KeeperLoop::new(
            Arc::new(scheduler),
            KeeperLoopConfig {
                interval: config.draw_interval,
            },
            cancel_token.clone(),
        ))
    });

    let whitelist_loop = cli.task.whitelist().then(|| {
        let sentinel = WhitelistSentinel::new(
            gateway.clone(),
            submitter.clone(),
            WhitelistSentinelConfig {
                callback_gas_price: config.callback_gas_price,
                callback_gas_limit: config.callback_gas_limit,
                tx_delay: config.whitelist_tx_delay,
                client_override: config.client_wallet_address,
            },
        );
        Arc::new(KeeperLoop::new(
            Arc::new(sentinel),
            KeeperLoopConfig {
                interval: config.whitelist_interval,
            },
            cancel_token.clone(),
        ))
    });

    let mode = if cli.watch {
        RunMode::Watch
    } else {
        RunMode::Once
    };

    if mode == RunMode::Once {
        let (draw, whitelist) = tokio::join!(run_optional(&draw_loop), run_optional(&whitelist_loop));
        submitter.shutdown().await;
        draw?;
        whitelist?;
        tracing::info!("✅ Single pass complete");
        return Ok(());
    }

    let draw_handle = draw_loop.map(spawn_watch);
    let whitelist_handle = whitelist_loop.map(spawn_watch);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    cancel_token.cancel();

    for handle in [draw_handle, whitelist_handle].into_iter().flatten() {
        if let Err(e) = handle.await? {
            tracing::error!("Keeper loop stopped with error: {}", e);
        }
    }
    submitter.shutdown().await;

    tracing::info!("Keeper stopped");
    Ok(())
}

async fn run_optional<T: PeriodicTask>(keeper: &Option<Arc<KeeperLoop<T>>>) -> Result<()> {
    match keeper {
        Some(keeper) => Ok(keeper.run(RunMode::Once).await?),
        None => Ok(()),
    }
}

fn spawn_watch<T: PeriodicTask + 'static>(
    keeper: Arc<KeeperLoop<T>>,
) -> tokio::task::JoinHandle<Result<(), chain::ChainError>> {
    tokio::spawn(async move { keeper.run(RunMode::Watch).await })
}
