//! brandrank-api - Brand ranking service
//!
//! Asks several chat models where a company ranks in its industry, overall
//! and per discovered dimension, and returns the matrix plus a summary over
//! HTTP (JSON or SSE).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use brandrank_common::config::{self, TomlConfig};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use brandrank_api::AppState;

/// Command-line arguments for brandrank-api
#[derive(Parser, Debug)]
#[command(name = "brandrank-api")]
#[command(about = "Brand ranking aggregation service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long, env = "BRANDRANK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "BRANDRANK_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(short, long, env = "BRANDRANK_BIND")]
    bind: Option<String>,

    /// Write a default config file to this path and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = args.init_config.as_deref() {
        config::write_toml_config(&TomlConfig::default(), path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // Initialize tracing before config loading so its log lines are kept;
    // the configured level replaces the startup filter once known
    let (filter, filter_handle) = reload::Layer::new(log_filter(STARTUP_LOG_LEVEL));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut toml_config =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        toml_config.port = port;
    }
    if let Some(bind) = args.bind {
        toml_config.bind_address = bind;
    }

    filter_handle
        .reload(log_filter(&toml_config.logging.level))
        .context("Failed to apply configured log level")?;

    info!("Starting brandrank-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let pipeline =
        brandrank_api::config::build_pipeline(&toml_config).context("Failed to build pipeline")?;
    let app = brandrank_api::build_router(AppState::new(pipeline));

    let ip: IpAddr = toml_config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", toml_config.bind_address))?;
    let addr = SocketAddr::new(ip, toml_config.port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Filter used until the config file has been read
const STARTUP_LOG_LEVEL: &str = "info";

/// `RUST_LOG` if set, otherwise `level` for this crate's logs
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", level)))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
