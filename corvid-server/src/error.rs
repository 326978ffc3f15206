//! Server error types.

use std::net::SocketAddr;
use thiserror::Error;

#[cfg(feature = "server")]
pub use self::response::ApiError;

/// Errors starting or running the gateway.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "server")]
mod response {
    use axum::extract::rejection::{FormRejection, JsonRejection};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use corvid_client::ClientError;
    use serde_json::{json, Value};
    use tracing::{debug, warn};

    /// Error returned by route handlers.
    ///
    /// Rendered as `{ "error": message, "response": upstream-body }`.
    /// Upstream API errors keep their status; transport failures become
    /// `502 Bad Gateway`.
    #[derive(Debug)]
    pub struct ApiError {
        status: StatusCode,
        message: String,
        response: Option<Value>,
    }

    impl ApiError {
        /// Create an error with a status and message.
        pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status,
                message: message.into(),
                response: None,
            }
        }

        /// Create a `400 Bad Request` error.
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Status the error renders with.
        pub fn status(&self) -> StatusCode {
            self.status
        }

        /// Error message.
        pub fn message(&self) -> &str {
            &self.message
        }
    }

    impl From<ClientError> for ApiError {
        fn from(err: ClientError) -> Self {
            let status = match &err {
                ClientError::Api { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ClientError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                ClientError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ClientError::Transport(_)
                | ClientError::InvalidResponse(_)
                | ClientError::Stream(_) => StatusCode::BAD_GATEWAY,
                ClientError::Configuration(_) | ClientError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };

            match err {
                ClientError::Api {
                    message, response, ..
                } => Self {
                    status,
                    message,
                    response,
                },
                other => Self::new(status, other.to_string()),
            }
        }
    }

    impl From<JsonRejection> for ApiError {
        fn from(rejection: JsonRejection) -> Self {
            Self::new(rejection.status(), rejection.body_text())
        }
    }

    impl From<FormRejection> for ApiError {
        fn from(rejection: FormRejection) -> Self {
            Self::new(rejection.status(), rejection.body_text())
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            if self.status.is_server_error() {
                warn!(status = self.status.as_u16(), error = %self.message, "Request failed");
            } else {
                debug!(status = self.status.as_u16(), error = %self.message, "Request rejected");
            }

            let body = json!({
                "error": self.message,
                "response": self.response.unwrap_or(Value::Null),
            });
            (self.status, Json(body)).into_response()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use corvid_streaming::StreamError;

        #[test]
        fn test_status_mapping() {
            let cases = [
                (ClientError::api(404, "missing", None), StatusCode::NOT_FOUND),
                (ClientError::api(429, "slow down", None), StatusCode::TOO_MANY_REQUESTS),
                (ClientError::api(1000, "weird", None), StatusCode::BAD_GATEWAY),
                (ClientError::invalid_request("empty"), StatusCode::BAD_REQUEST),
                (ClientError::Timeout, StatusCode::GATEWAY_TIMEOUT),
                (ClientError::Transport("refused".into()), StatusCode::BAD_GATEWAY),
                (ClientError::Stream(StreamError::transport("eof")), StatusCode::BAD_GATEWAY),
                (ClientError::configuration("no key"), StatusCode::INTERNAL_SERVER_ERROR),
            ];

            for (err, expected) in cases {
                assert_eq!(ApiError::from(err).status(), expected);
            }
        }

        #[test]
        fn test_api_error_keeps_upstream_message() {
            let err = ApiError::from(ClientError::api(
                401,
                "Invalid API key",
                Some(json!({"error": "Invalid API key"})),
            ));
            assert_eq!(err.message(), "Invalid API key");
            assert_eq!(err.response, Some(json!({"error": "Invalid API key"})));
        }
    }
}
