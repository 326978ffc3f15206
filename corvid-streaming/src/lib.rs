//! # corvid-streaming
//!
//! Incremental NDJSON relay for streaming Corvid API responses.
//!
//! The Corvid API streams collection query results as newline-delimited JSON.
//! This crate turns a chunked response body into a sequence of complete JSON
//! records as they arrive, however the network happens to cut the bytes.
//!
//! ## Core Concepts
//!
//! - **[`NdjsonDecoder`]**: Synchronous framer that buffers at most one partial record
//! - **[`NdjsonStream`]**: Pull-based `Stream` of [`EmittedEvent`]s over a byte stream
//! - **[`EventSink`]**: Push destination, flushed after every record
//! - **[`relay`]**: Drive a stream into a sink with cooperative cancellation
//!
//! Malformed records are skipped and logged through `tracing`; they never
//! reach the consumer and never stop the relay. Transport and sink failures
//! end the relay with a [`StreamError`].
//!
//! ## Example - Pull
//!
//! ```ignore
//! use corvid_streaming::NdjsonStream;
//! use futures::StreamExt;
//!
//! let mut events = NdjsonStream::new(response.bytes_stream());
//! while let Some(event) = events.next().await {
//!     println!("{}", event?.as_str());
//! }
//! ```
//!
//! ## Example - Push
//!
//! ```ignore
//! use corvid_streaming::{relay, ChannelSink, NdjsonStream};
//! use tokio_util::sync::CancellationToken;
//!
//! let (mut sink, rx) = ChannelSink::channel(16);
//! let outcome = relay(NdjsonStream::new(body), &mut sink, &CancellationToken::new()).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decoder;
pub mod error;
pub mod record;
pub mod relay;
pub mod sink;
pub mod stream;

// Re-exports
pub use decoder::{NdjsonDecoder, DEFAULT_MAX_RECORD_LEN};
pub use error::{BoxError, RecordParseError, RecordParseErrorKind, StreamError, StreamResult};
pub use record::{EmittedEvent, Record};
pub use relay::{relay, RelayOutcome};
pub use sink::{ChannelSink, EventSink, WriterSink};
pub use stream::{NdjsonStream, RelayStats};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        relay, ChannelSink, EmittedEvent, EventSink, NdjsonStream, RelayOutcome, RelayStats,
        StreamError, StreamResult,
    };
}
