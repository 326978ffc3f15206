//! Client configuration.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.corvid.ai";

/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for a [`CorvidClient`](crate::CorvidClient).
///
/// Passed explicitly to the client; nothing is read from process-wide state
/// unless [`from_env`](Self::from_env) is called.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key sent as a bearer token.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Version segment prefixed to every path.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Base URL. Override to point at a test server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for non-streaming requests in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Custom `User-Agent` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    /// Create a config with an API key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_version: default_api_version(),
            base_url: default_base_url(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }

    /// Set the API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the timeout for non-streaming requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs();
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Timeout for non-streaming requests.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Load from environment variables with given prefix.
    ///
    /// Looks for:
    /// - `{PREFIX}_API_KEY` (required)
    /// - `{PREFIX}_API_VERSION`
    /// - `{PREFIX}_BASE_URL`
    /// - `{PREFIX}_TIMEOUT_SECS`
    pub fn from_env(prefix: &str) -> ClientResult<Self> {
        let api_key = std::env::var(format!("{}_API_KEY", prefix))
            .map_err(|_| ClientError::configuration(format!("{}_API_KEY not set", prefix)))?;

        let mut config = Self::new(api_key);

        if let Ok(version) = std::env::var(format!("{}_API_VERSION", prefix)) {
            config.api_version = version;
        }
        if let Ok(url) = std::env::var(format!("{}_BASE_URL", prefix)) {
            config.base_url = url;
        }
        if let Ok(secs) = std::env::var(format!("{}_TIMEOUT_SECS", prefix)) {
            config.timeout_seconds = secs.parse().map_err(|_| {
                ClientError::configuration(format!("{}_TIMEOUT_SECS is not a number: {}", prefix, secs))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the config can be used to build requests.
    pub fn validate(&self) -> ClientResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::configuration("API key is empty"));
        }
        if self.api_version.trim().is_empty() || self.api_version.contains('/') {
            return Err(ClientError::configuration(format!(
                "Invalid API version: {:?}",
                self.api_version
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(ClientError::configuration("Timeout must be at least one second"));
        }
        self.parsed_base_url().map(|_| ())
    }

    /// Build the full URL for a path below the versioned root.
    ///
    /// Segments are percent-encoded individually, so collection names may
    /// contain `/` or spaces.
    pub fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> ClientResult<Url> {
        let mut url = self.parsed_base_url()?;
        url.path_segments_mut()
            .map_err(|_| ClientError::configuration("Base URL cannot have a path"))?
            .pop_if_empty()
            .push(&self.api_version)
            .extend(segments.iter().map(AsRef::as_ref));
        Ok(url)
    }

    fn parsed_base_url(&self) -> ClientResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::configuration(format!("Invalid base URL {:?}: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::configuration(format!(
                "Unsupported base URL scheme: {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
