//! Implementation of the `watchtower run` command.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::load_config;
use crate::domain::models::Config;
use crate::domain::ports::ChainGateway;
use crate::error::WatchtowerResult;
use crate::infrastructure::beacon::BeaconFeedClient;
use crate::infrastructure::chain::JsonRpcChainGateway;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::services::{EventBus, WatchtowerProcess};

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    let process = assemble(&config)
        .await
        .context("Failed to start watchtower")?;
    let handle = process.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping watchtower...");

    handle.shutdown().await;
    info!("Watchtower stopped");
    Ok(())
}

/// Build the chain gateway and connect the status feed
async fn assemble(config: &Config) -> WatchtowerResult<WatchtowerProcess> {
    let bus = Arc::new(EventBus::new());

    let chain = JsonRpcChainGateway::from_config(&config.chain, &config.contracts)?;
    info!(
        rpc_url = %config.chain.rpc_url,
        node = %chain.node_address(),
        watchtower = %chain.contracts().rocket_node_watchtower,
        "Execution client configured"
    );

    let feed = BeaconFeedClient::connect(&config.beacon.address, Arc::clone(&bus)).await?;

    Ok(WatchtowerProcess::new(Arc::new(chain), Arc::new(feed), bus))
}
