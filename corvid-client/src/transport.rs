//! Transports that carry API requests.
//!
//! [`CorvidClient`](crate::CorvidClient) builds [`ApiRequest`]s and hands them
//! to an [`ApiTransport`]. [`HttpTransport`] talks to the real API over
//! reqwest; [`MemoryTransport`] replays canned responses for tests.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Content type of streaming responses.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Chunked response body of a streaming call.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Body of an API request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON body.
    Json(Value),
    /// `application/x-www-form-urlencoded` body.
    Form(Vec<(String, String)>),
}

/// One API call, relative to the versioned root.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path segments, unencoded.
    pub segments: Vec<String>,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    /// Create a request without a body.
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            body: RequestBody::Empty,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach a form body.
    #[must_use]
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Path joined with `/`, for logs and assertions.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Carries requests to the API.
#[async_trait]
pub trait ApiTransport: Send + Sync + fmt::Debug {
    /// Send a request and decode the JSON response.
    ///
    /// An empty success body decodes to `Value::Null`.
    async fn send(&self, request: &ApiRequest) -> ClientResult<Value>;

    /// Send a request and return the response body as a byte stream.
    ///
    /// The status is checked before the stream is returned, so API errors
    /// surface here and not as stream items.
    async fn open_stream(&self, request: &ApiRequest) -> ClientResult<ByteStream>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a transport for a validated config.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("corvid-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create with a custom reqwest client.
    ///
    /// The bearer token and configured user agent are still added per request.
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build(&self, request: &ApiRequest) -> ClientResult<reqwest::RequestBuilder> {
        let url = self.config.endpoint(&request.segments)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(&self.config.api_key);

        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.header(USER_AGENT, user_agent);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };
        Ok(builder)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> ClientResult<Value> {
        debug!(method = %request.method, path = %request.path(), "Sending Corvid request");

        let response = self
            .build(request)?
            .timeout(self.config.timeout())
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::invalid_response(format!("Response is not JSON: {}", e)))
    }

    async fn open_stream(&self, request: &ApiRequest) -> ClientResult<ByteStream> {
        debug!(method = %request.method, path = %request.path(), "Opening Corvid stream");

        let response = self
            .build(request)?
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(response.bytes_stream().map_err(ClientError::from).boxed())
    }
}

/// Build an API error from a non-success response body.
fn api_error(status: u16, body: &[u8]) -> ClientError {
    let response: Option<Value> = serde_json::from_slice(body).ok();
    let message = response
        .as_ref()
        .and_then(error_message)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| format!("HTTP {}", status));
    ClientError::api(status, message, response)
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(message)) => return Some(message.clone()),
        Some(Value::Object(error)) => {
            if let Some(Value::String(message)) = error.get("message") {
                return Some(message.clone());
            }
        }
        _ => {}
    }
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

enum Canned {
    Json(ClientResult<Value>),
    Stream(Vec<Result<Bytes, ClientError>>),
}

/// In-memory transport for tests.
///
/// Responses are replayed in the order they were pushed, whichever method
/// consumes them. Every request is recorded.
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<VecDeque<Canned>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response.
    pub fn push_response(&self, value: Value) {
        self.responses.lock().push_back(Canned::Json(Ok(value)));
    }

    /// Queue an error.
    pub fn push_error(&self, error: ClientError) {
        self.responses.lock().push_back(Canned::Json(Err(error)));
    }

    /// Queue a streaming response made of the given chunks.
    pub fn push_stream<I, B>(&self, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks = chunks.into_iter().map(|c| Ok(c.into())).collect();
        self.responses.lock().push_back(Canned::Stream(chunks));
    }

    /// Queue a streaming response that fails after the given chunks.
    pub fn push_broken_stream<I, B>(&self, chunks: I, error: ClientError)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut items: Vec<_> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        items.push(Err(error));
        self.responses.lock().push_back(Canned::Stream(items));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Most recent request.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }

    fn next(&self, request: &ApiRequest) -> ClientResult<Canned> {
        self.requests.lock().push(request.clone());
        self.responses.lock().pop_front().ok_or_else(|| {
            ClientError::Transport(format!("No response queued for {}", request.path()))
        })
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("queued", &self.responses.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

#[async_trait]
impl ApiTransport for MemoryTransport {
    async fn send(&self, request: &ApiRequest) -> ClientResult<Value> {
        match self.next(request)? {
            Canned::Json(result) => result,
            Canned::Stream(_) => Err(ClientError::invalid_response(
                "Streaming response queued for a non-streaming call",
            )),
        }
    }

    async fn open_stream(&self, request: &ApiRequest) -> ClientResult<ByteStream> {
        match self.next(request)? {
            Canned::Stream(chunks) => Ok(stream::iter(chunks).boxed()),
            Canned::Json(Err(error)) => Err(error),
            Canned::Json(Ok(_)) => Err(ClientError::invalid_response(
                "JSON response queued for a streaming call",
            )),
        }
    }
}
