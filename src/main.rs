//! fstab-router server.
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!  Client request     │                   fstab-router                     │
//!  ───────────────────┼─▶ request id ─▶ dispatch ─▶ longest mount match    │
//!                     │                     │                              │
//!                     │        ┌────────────┼──────────────┐               │
//!                     │        ▼            ▼              ▼               │
//!                     │   reverse proxy  local handler  root (+ jail)      │
//!                     │        │                                           │
//!                     │        └──────────────────────────────────────────┼──▶ Origin
//!                     │                                                    │
//!                     │  fstab.json ─▶ reload scheduler ─▶ build ─▶ swap   │
//!                     └────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use clap::Parser;
use tokio::net::TcpListener;

use fstab_router::config::loader::load_config;
use fstab_router::config::RouterConfig;
use fstab_router::observability::{logging, metrics};
use fstab_router::{MountOptions, MountRouter};

#[derive(Parser)]
#[command(name = "fstab-router")]
#[command(about = "HTTP router serving a hot-reloaded mount table", long_about = None)]
struct Cli {
    /// Router settings (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mount table (JSON); overrides the settings file.
    #[arg(short, long)]
    fstab: Option<String>,

    /// Listen address; overrides the settings file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Seconds between reloads, 0 to disable; overrides the settings file.
    #[arg(short, long)]
    period: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(fstab) = cli.fstab {
        config.mounts.fstab_path = fstab;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(period) = cli.period {
        config.mounts.reload_period_secs = period;
    }

    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("fstab-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        fstab = %config.mounts.fstab_path,
        reload_period_secs = config.mounts.reload_period_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = MountRouter::start(MountOptions::from_config(&config)).await?;

    // Status handler: mount it with `"mounts": "/_mounts"` in the table.
    let table = router.table();
    let status = move || {
        let table = Arc::clone(&table);
        async move { Json(table.load().entries().to_vec()) }
    };
    if let Err(e) = router.register("mounts", status).await {
        tracing::warn!(error = %e, "Mount table not loaded yet");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let app = router
        .service()
        .into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    router.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
