mod api;
mod commander;
mod config;
mod dispatch;

use anyhow::Context;
use config::ServerConfig;
use dispatch::DispatchQueue;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    let level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Booster command server starting");
    info!("  Robot: {}", config.robot);
    info!("  Bind: {}", config.bind_address);

    let commander = commander::connect(&config).await?;
    let queue = Arc::new(DispatchQueue::start(commander));
    info!("Commander ready ({} robot)", queue.robot_kind());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("HTTP API listening on {}", config.bind_address);

    axum::serve(listener, api::router(queue.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    match Arc::try_unwrap(queue) {
        Ok(queue) => queue.shutdown().await,
        Err(_) => warn!("Dispatch queue still shared, skipping drain"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
