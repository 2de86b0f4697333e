//! tunegate-gw - Music catalog gateway
//!
//! Fronts an unofficial music-catalog upstream and re-exposes it
//! through a normalized HTTP surface. Every logical operation is
//! resolved through a multi-tier fallback chain, so callers always get
//! a well-formed envelope even when the upstream degrades.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunegate_common::config::GatewayConfig;
use tunegate_gw::{build_router, operations::OperationRegistry, upstream::UpstreamClient, AppState};

/// Command-line arguments for tunegate-gw
#[derive(Parser, Debug)]
#[command(name = "tunegate-gw")]
#[command(about = "Music catalog gateway with multi-tier fallback resolution")]
#[command(version)]
struct Args {
    /// Socket address to listen on (overrides config file)
    #[arg(short, long, env = "TUNEGATE_BIND_ADDR")]
    bind: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long, env = "TUNEGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = GatewayConfig::resolve(args.config.as_deref())
        .context("Failed to resolve configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());

    info!("Starting tunegate-gw (catalog gateway)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Upstream: {}", config.upstream_base_url);
    info!("Per-tier timeout: {}ms", config.tier_timeout_ms);

    let transport = UpstreamClient::new(&config.upstream_base_url)
        .context("Failed to build upstream client")?;
    let registry = OperationRegistry::new(config.tier_timeout());
    info!("Registered operations: {:?}", registry.operation_names());

    let state = AppState::new(Arc::new(transport), registry);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to install ctrl-c handler");
    info!("Shutdown signal received");
}
