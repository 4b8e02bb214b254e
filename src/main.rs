#![forbid(unsafe_code)]

//! `iqc-tracker`: incoming quality control server binary.
//!
//! Bootstraps configuration, opens the local and warehouse stores, starts
//! the optional periodic sync, and serves the REST API until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use iqc_tracker::api::{self, AppState};
use iqc_tracker::config::GlobalConfig;
use iqc_tracker::persistence::db;
use iqc_tracker::sync::scheduler;
use iqc_tracker::warehouse::{PendingStatuses, SqliteWarehouse, WarehouseSource};
use iqc_tracker::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "iqc-tracker", about = "Incoming quality control tracker", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port from the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Override the local database path from the config file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Create the warehouse invoice table if it is missing.
    #[arg(long)]
    init_warehouse: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("iqc-tracker bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(path) = args.db {
        config.db_path = path;
    }
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Open stores ─────────────────────────────────────
    let local = Arc::new(db::connect(&config.db_path).await?);
    info!(path = %config.db_path.display(), "local store connected");

    let warehouse_pool = Arc::new(db::open(&config.warehouse.db_path).await?);
    let sqlite_warehouse = SqliteWarehouse::new(
        Arc::clone(&warehouse_pool),
        PendingStatuses::new(&config.warehouse.pending_statuses),
    );
    if args.init_warehouse {
        sqlite_warehouse.bootstrap_schema().await?;
    }
    let warehouse: Arc<dyn WarehouseSource> = Arc::new(sqlite_warehouse);
    info!(path = %config.warehouse.db_path.display(), "warehouse store connected");

    let state = Arc::new(AppState::new(
        Arc::clone(&config),
        Arc::clone(&local),
        warehouse,
    ));

    // ── Background sync ─────────────────────────────────
    let ct = CancellationToken::new();
    let sync_handle = config.sync_interval().map(|interval| {
        info!(seconds = interval.as_secs(), "periodic sync enabled");
        scheduler::spawn_sync_task(state.reconciler.clone(), interval, ct.clone())
    });

    // ── Serve ───────────────────────────────────────────
    info!("iqc-tracker ready");
    let served = api::serve_until(Arc::clone(&state), ct.clone(), shutdown_signal()).await;

    if let Some(handle) = sync_handle {
        let _ = handle.await;
    }

    local.close().await;
    warehouse_pool.close().await;
    info!("iqc-tracker shut down");

    served
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
