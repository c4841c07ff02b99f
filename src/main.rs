use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use coinx_rs::api;
use coinx_rs::config::Settings;
use coinx_rs::engine::refresh::RefreshLoop;
use coinx_rs::market_data::adapters::coingecko::CoinGeckoAdapter;
use coinx_rs::persist::memory::MemoryCoinStore;
use coinx_rs::persist::postgres::PostgresCoinStore;
use coinx_rs::persist::CoinStore;
use coinx_rs::telemetry;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "coinx", version, about = "Poll a market feed into storage and serve it over HTTP")]
struct Cli {
    /// Settings file (defaults to ./coinx.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres, global = true)]
    store: StoreKind,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Postgres,
    /// Process-local, lost on exit
    Memory,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate, start the refresh loop and serve the read API (default)
    Serve,
    /// Migrate and run exactly one refresh tick
    RefreshOnce,
    /// Create the coins table if it is missing
    Migrate,
}

async fn open_store(kind: StoreKind, settings: &Settings) -> anyhow::Result<Arc<dyn CoinStore>> {
    let store: Arc<dyn CoinStore> = match kind {
        StoreKind::Postgres => Arc::new(
            PostgresCoinStore::connect(&settings.database.url, settings.database.max_connections)
                .await
                .context("connecting to postgres")?,
        ),
        StoreKind::Memory => Arc::new(MemoryCoinStore::new()),
    };
    store.migrate().await.context("running schema migration")?;
    Ok(store)
}

fn build_loop(settings: &Settings, store: Arc<dyn CoinStore>) -> anyhow::Result<RefreshLoop> {
    let feed = CoinGeckoAdapter::from_settings(&settings.feed).context("building feed client")?;
    info!(url = feed.markets_url(), "feed configured");
    Ok(RefreshLoop::new(Arc::new(feed), store).with_interval(settings.refresh.interval()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    telemetry::init_tracing(&settings.log.filter);
    telemetry::init_metrics(settings.metrics.port)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            open_store(cli.store, &settings).await?;
            info!("migration complete");
        }
        Command::RefreshOnce => {
            let store = open_store(cli.store, &settings).await?;
            let report = build_loop(&settings, store)?.run_tick().await;
            println!(
                "outcome={:?} fetched={} applied={} timestamp_fallbacks={}",
                report.outcome, report.fetched, report.applied, report.timestamp_fallbacks
            );
        }
        Command::Serve => {
            let store = open_store(cli.store, &settings).await?;
            let refresh = build_loop(&settings, Arc::clone(&store))?.spawn();

            let addr = settings.server.bind_addr();
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            api::serve(listener, store, shutdown_signal()).await?;

            refresh.abort();
            info!("stopped");
        }
    }

    Ok(())
}
