//! Streaming errors.

use thiserror::Error;

/// Boxed upstream failure carried by [`StreamError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that terminate a relay.
///
/// None of these are ever encoded as a data record: a consumer sees them as
/// the end of the stream, distinct from any JSON line.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The upstream byte stream failed mid-flight.
    ///
    /// The upstream error is kept as the source so callers can downcast it.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The downstream sink stopped accepting output.
    #[error("Sink error: {0}")]
    Sink(String),

    /// A single pending record outgrew the buffer limit.
    #[error("Record too large: {size} bytes exceeds maximum {max}")]
    RecordTooLarge {
        /// Bytes buffered for the pending record.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// IO error while writing to a sink.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Create a transport error from an upstream error or a message.
    pub fn transport<E: Into<BoxError>>(err: E) -> Self {
        Self::Transport(err.into())
    }

    /// Create a sink error from anything displayable.
    pub fn sink<E: std::fmt::Display>(err: E) -> Self {
        Self::Sink(err.to_string())
    }

    /// The upstream error behind a transport failure, if it is a `T`.
    pub fn transport_source<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Transport(source) => source.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Whether the failure came from the downstream side.
    #[must_use]
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Self::Sink(_) | Self::Io(_))
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Why a single record could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordParseErrorKind {
    /// The record bytes are not valid UTF-8.
    Utf8,
    /// The record text is not a JSON value.
    Json,
}

/// A record that was skipped. Never fatal.
#[derive(Debug, Clone, Error)]
#[error("Malformed record at line {line} ({kind:?}): {message}")]
pub struct RecordParseError {
    /// 1-based line number within the stream.
    pub line: u64,
    /// Failure classification.
    pub kind: RecordParseErrorKind,
    /// Decoder message.
    pub message: String,
}
