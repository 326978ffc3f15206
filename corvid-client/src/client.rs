//! The Corvid API client.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiTransport, ByteStream, HttpTransport};
use corvid_streaming::{NdjsonDecoder, NdjsonStream, DEFAULT_MAX_RECORD_LEN};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Environment prefix read by [`CorvidClient::from_env`].
pub const ENV_PREFIX: &str = "CORVID";

/// Events of a streaming query, decoded as they arrive.
pub type EventStream = NdjsonStream<ByteStream>;

/// Client for the Corvid AI API.
///
/// Cheap to clone; clones share the underlying transport and connection pool.
/// Endpoint methods live in the [`api`](crate::api) modules.
#[derive(Debug, Clone)]
pub struct CorvidClient {
    transport: Arc<dyn ApiTransport>,
    max_record_len: usize,
}

impl CorvidClient {
    /// Create a client talking HTTP to the configured base URL.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Create a client from `CORVID_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env(ENV_PREFIX)?)
    }

    /// Create a client over any transport.
    pub fn with_transport(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }

    /// Limit the size of a single streamed record.
    #[must_use]
    pub fn with_max_record_len(mut self, max: usize) -> Self {
        self.max_record_len = max;
        self
    }

    /// The transport in use.
    pub fn transport(&self) -> &Arc<dyn ApiTransport> {
        &self.transport
    }

    pub(crate) async fn call(&self, request: ApiRequest) -> ClientResult<Value> {
        self.transport.send(&request).await
    }

    pub(crate) async fn call_as<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let value = self.call(request).await?;
        decode(value)
    }

    /// Send and decode one top-level field of the response object.
    pub(crate) async fn call_field<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        field: &str,
    ) -> ClientResult<T> {
        let value = self.call(request).await?;
        decode(take_field(value, field)?)
    }

    pub(crate) async fn stream(&self, request: ApiRequest) -> ClientResult<EventStream> {
        let body = self.transport.open_stream(&request).await?;
        Ok(NdjsonStream::with_decoder(
            body,
            NdjsonDecoder::with_max_record_len(self.max_record_len),
        ))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::invalid_response(format!("Unexpected response shape: {}", e)))
}

fn take_field(value: Value, field: &str) -> ClientResult<Value> {
    match value {
        Value::Object(mut map) => map
            .remove(field)
            .ok_or_else(|| ClientError::invalid_response(format!("Response has no `{}` field", field))),
        other => Err(ClientError::invalid_response(format!(
            "Expected a JSON object with `{}`, got {}",
            field, other
        ))),
    }
}
