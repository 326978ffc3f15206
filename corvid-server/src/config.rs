//! Gateway configuration.

use crate::error::ServerError;
use corvid_client::{ClientConfig, ENV_PREFIX};
use std::net::SocketAddr;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Configuration for the `corvid-gateway` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// Upstream client settings.
    pub client: ClientConfig,
}

impl ServerConfig {
    /// Load from `CORVID_*` environment variables.
    ///
    /// `CORVID_BIND` and `CORVID_LOG_JSON` are read here; the client
    /// settings come from [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, ServerError> {
        let bind = std::env::var(format!("{}_BIND", ENV_PREFIX))
            .unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let log_json = std::env::var(format!("{}_LOG_JSON", ENV_PREFIX))
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(Self {
            bind: parse_bind(&bind)?,
            log_json,
            client: ClientConfig::from_env(ENV_PREFIX)
                .map_err(|e| ServerError::Config(e.to_string()))?,
        })
    }
}

fn parse_bind(value: &str) -> Result<SocketAddr, ServerError> {
    value
        .parse()
        .map_err(|e| ServerError::Config(format!("Invalid bind address {:?}: {}", value, e)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
