//! `corvid-gateway`: forwards HTTP requests to the Corvid API.

use anyhow::Context;
use corvid_client::CorvidClient;
use corvid_server::telemetry::DEFAULT_FILTER;
use corvid_server::{init_tracing, router, serve, shutdown_signal, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    init_tracing(DEFAULT_FILTER, config.log_json);

    let client = CorvidClient::new(config.client.clone()).context("Failed to create client")?;
    info!(
        bind = %config.bind,
        base_url = %config.client.base_url,
        api_version = %config.client.api_version,
        "Starting corvid-gateway"
    );

    serve(router(client), config.bind, shutdown_signal()).await?;
    Ok(())
}
