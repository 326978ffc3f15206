//! # corvid-server
//!
//! axum integration for [`corvid_client`].
//!
//! [`router`] exposes every client operation as an HTTP route so a web
//! application can forward Corvid calls to its own clients. Streaming
//! collection queries are relayed as `application/x-ndjson`, one record per
//! line, flushed as each record completes.
//!
//! ## Example
//!
//! ```ignore
//! use corvid_client::{ClientConfig, CorvidClient};
//! use corvid_server::{router, serve, shutdown_signal};
//!
//! let client = CorvidClient::new(ClientConfig::new("sk-..."))?;
//! let app = axum::Router::new().nest("/corvid", router(client));
//! serve(app, "127.0.0.1:8080".parse()?, shutdown_signal()).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod ndjson;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use telemetry::init_tracing;

#[cfg(feature = "server")]
pub use error::ApiError;
#[cfg(feature = "server")]
pub use ndjson::ndjson_response;
#[cfg(feature = "server")]
pub use routes::router;
#[cfg(feature = "server")]
pub use server::{serve, shutdown_signal};
