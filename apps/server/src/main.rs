//! Signage Server - Standalone headless server for the signage control plane.
//!
//! Serves the admin console API (content, playlist, publish, control) and the
//! player polling endpoints. Runs as a background daemon; all state other
//! than content metadata and uploaded media is held in memory.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use signage_core::{bootstrap_services, start_server, AppState, LoggingEventEmitter};
use tokio::signal;

use crate::config::ServerConfig;

/// Signage Server - Multi-tenant digital signage control plane.
#[derive(Parser, Debug)]
#[command(name = "signage-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SIGNAGE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "SIGNAGE_BIND_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config file).
    #[arg(short = 'b', long, env = "SIGNAGE_BIND_ADDRESS")]
    bind: Option<std::net::IpAddr>,

    /// Data directory for durable content metadata.
    #[arg(short = 'd', long, env = "SIGNAGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory uploaded media is written to.
    #[arg(short = 'u', long, env = "SIGNAGE_UPLOADS_DIR")]
    uploads_dir: Option<PathBuf>,

    /// HS256 secret used to verify admin console tokens.
    #[arg(long, env = "SIGNAGE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Signage Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(uploads_dir) = args.uploads_dir {
        config.uploads_dir = uploads_dir;
    }
    if let Some(secret) = args.jwt_secret {
        config.jwt_secret = Some(secret);
    }

    log::info!(
        "Configuration: bind={}:{}, tenancy={}, uploads_dir={}",
        config.bind_address,
        config.bind_port,
        config.single_tenant.as_deref().unwrap_or("multi"),
        config.uploads_dir.display()
    );
    match &config.data_dir {
        Some(dir) => log::info!("Using data directory: {}", dir.display()),
        None => log::info!("No data directory configured - content will not persist"),
    }

    // Bootstrap services
    let services = bootstrap_services(config.to_core_config(), Arc::new(LoggingEventEmitter))
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppState::new(&services);

    // Serve until a shutdown signal arrives; in-flight requests are drained.
    start_server(app_state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, draining connections...");
}
