//! facetag-server - shared event photo tagging service
//!
//! Serves the event state (merge-on-save), the self-serve tag list
//! (replace-on-save) and face detection over HTTP.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use facetag_common::config::{self, TomlConfig};
use facetag_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for facetag-server
#[derive(Parser, Debug)]
#[command(name = "facetag-server")]
#[command(about = "Shared event photo tagging service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "FACETAG_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "FACETAG_PORT")]
    port: Option<u16>,

    /// Folder holding persisted data (overrides env and config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply;
    // its own warnings are emitted once the subscriber is up.
    let config_result = TomlConfig::load(args.config.as_deref());
    let logging = config_result
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let log_level = logging.level.clone();

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("facetag_server={lvl},facetag_common={lvl},tower_http=info", lvl = log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!(
        "Starting facetag-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = config_result.context("Failed to load configuration")?;
    if let Some(file) = &config.logging.file {
        info!("Also logging to {}", file.display());
    }

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let state = AppState::from_config(&config, &root_folder);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let ip = config
        .bind_address
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid bind_address '{}'", config.bind_address))?;
    let addr = SocketAddr::new(ip, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("facetag-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("facetag-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
