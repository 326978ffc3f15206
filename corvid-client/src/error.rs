//! Client error types.

use corvid_streaming::StreamError;
use serde_json::Value;
use thiserror::Error;

/// Errors returned by the Corvid client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    ///
    /// `response` holds the decoded error body when it was JSON.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body.
        message: String,
        /// Decoded response body, if any.
        response: Option<Value>,
    },

    /// The request could not be sent or the connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A streaming relay ended with an error.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl ClientError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>, response: Option<Value>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            response,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// HTTP status reported by the API, if the failure came from one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Stream(err) => err.transport_source::<ClientError>().and_then(Self::status),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Stream(err @ StreamError::Transport(_)) => err
                .transport_source::<ClientError>()
                .map_or(true, ClientError::is_retryable),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
