//! # corvid-client
//!
//! Typed async client for the Corvid AI API.
//!
//! Every non-streaming method builds one request, sends it through an
//! [`ApiTransport`] and narrows the JSON response to a typed value. The
//! streaming collection query returns an [`EventStream`] that yields each
//! NDJSON record as soon as it is complete.
//!
//! ## Example
//!
//! ```ignore
//! use corvid_client::prelude::*;
//! use futures::StreamExt;
//!
//! let client = CorvidClient::new(ClientConfig::new("sk-..."))?;
//!
//! let answer = client
//!     .query_collection("docs", CollectionQuery::new("How do I reset my password?"))
//!     .await?;
//! println!("{}", answer.answer);
//!
//! let mut events = client
//!     .query_collection_stream("docs", CollectionQuery::new("Summarize the docs"))
//!     .await?;
//! while let Some(event) = events.next().await {
//!     println!("{}", event?.as_str());
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use api::{
    CategorizationRequest, Category, Collection, CollectionOptions, CollectionQuery, Document,
    ExtractionRequest, Generation, GenerationRequest, ImageSource, ImageToTextRequest,
    QueryAnswer, QuerySource, Usage,
};
pub use client::{CorvidClient, EventStream, ENV_PREFIX};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use transport::{
    ApiRequest, ApiTransport, ByteStream, HttpTransport, MemoryTransport, RequestBody,
    NDJSON_CONTENT_TYPE,
};

// The streaming types appear in this crate's public API.
pub use corvid_streaming;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClientResult, CollectionOptions, CollectionQuery, CorvidClient,
        Document, EventStream, GenerationRequest,
    };
}
