//! Courier Runner binary
//!
//! Registers with the task server and executes tasks until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_client::{StaticToken, TaskServerClient};
use courier_runner::{Config, EchoHandler, HandlerRouter, Poller};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_runner=info,courier_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Courier Runner");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Loaded configuration: name={}, manager_endpoint={}, workers={}",
        config.name, config.manager_endpoint, config.parallel_workers
    );

    // Initialize task server client
    let client = TaskServerClient::new(
        config.manager_endpoint.clone(),
        config.account_id.clone(),
        StaticToken::new(config.account_secret.clone()),
        config.skip_verify,
    )
    .context("Failed to build task server client")?
    .with_retry_interval(config.retry_interval);

    if config.skip_verify {
        warn!("TLS certificate verification is disabled");
    }

    let router = HandlerRouter::new().with_handler("ECHO", EchoHandler);

    let poller = Poller::new(config, Arc::new(client), Arc::new(router));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        shutdown.cancel();
    });

    let runner = poller.register(&cancel).await?;
    info!("Runner registered: {}", runner);

    info!("Starting task polling loop");
    if let Err(e) = poller.poll(&runner.id, &cancel).await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
