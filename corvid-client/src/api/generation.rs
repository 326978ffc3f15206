//! Text generation.

use super::require_non_empty;
use crate::client::CorvidClient;
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiRequest;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Request for [`CorvidClient::generate_text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Prompt text.
    pub prompt: String,
    /// Model name; the API default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl GenerationRequest {
    /// Create a request for a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            system: None,
            max_tokens: None,
            temperature: None,
            stop: Vec::new(),
        }
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set system instructions.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Add a stop sequence.
    #[must_use]
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    fn validate(&self) -> ClientResult<()> {
        require_non_empty("prompt", &self.prompt)?;
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ClientError::invalid_request(format!(
                    "temperature must be between 0 and 2, got {}",
                    t
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ClientError::invalid_request("max_tokens must be at least 1"));
        }
        Ok(())
    }
}

/// Generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// The generated text.
    pub text: String,
    /// Model that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage of one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Generated tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u64,
}

impl CorvidClient {
    /// Generate text from a prompt.
    pub async fn generate_text(&self, request: GenerationRequest) -> ClientResult<Generation> {
        request.validate()?;
        let body = serde_json::to_value(&request)?;
        self.call_as(ApiRequest::new(Method::POST, ["generate"]).json(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, RequestBody};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_generate_text() {
        let transport = Arc::new(MemoryTransport::new());
        transport.push_response(json!({
            "text": "Once upon a time",
            "model": "corvid-large",
            "usage": {"prompt_tokens": 4, "completion_tokens": 4, "total_tokens": 8}
        }));
        let client = CorvidClient::with_transport(transport.clone());

        let generation = client
            .generate_text(
                GenerationRequest::new("Tell a story")
                    .with_max_tokens(64)
                    .with_stop("THE END"),
            )
            .await
            .unwrap();

        assert_eq!(generation.text, "Once upon a time");
        assert_eq!(generation.usage.unwrap().total_tokens, 8);

        let request = transport.last_request().unwrap();
        assert_eq!(request.path(), "/generate");
        assert_eq!(
            request.body,
            RequestBody::Json(json!({
                "prompt": "Tell a story",
                "max_tokens": 64,
                "stop": ["THE END"]
            }))
        );
    }

    #[tokio::test]
    async fn test_generate_minimal_response() {
        let transport = Arc::new(MemoryTransport::new());
        transport.push_response(json!({"text": "ok"}));
        let client = CorvidClient::with_transport(transport);

        let generation = client.generate_text(GenerationRequest::new("hi")).await.unwrap();
        assert_eq!(generation.model, None);
        assert_eq!(generation.usage, None);
    }

    #[test]
    fn test_validation() {
        assert!(GenerationRequest::new("").validate().is_err());
        assert!(GenerationRequest::new("x").with_temperature(3.5).validate().is_err());
        assert!(GenerationRequest::new("x").with_max_tokens(0).validate().is_err());
        assert!(GenerationRequest::new("x").with_temperature(0.7).validate().is_ok());
    }
}
