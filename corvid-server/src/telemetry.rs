//! Tracing subscriber setup for the gateway binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "corvid_server=info,corvid_client=info,corvid_streaming=info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_filter`. With `json` set, every event is
/// written as one JSON line.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(default_filter: &str, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
