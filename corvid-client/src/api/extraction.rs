//! Web data extraction.

use super::{parse_web_url, require_non_empty};
use crate::client::CorvidClient;
use crate::error::ClientResult;
use crate::transport::ApiRequest;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Request for [`CorvidClient::extract_web_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Page to read.
    pub url: Url,
    /// Names of the fields to extract.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Free-form extraction instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ExtractionRequest {
    /// Create a request for a page URL.
    pub fn new(url: &str) -> ClientResult<Self> {
        Ok(Self {
            url: parse_web_url(url)?,
            fields: Vec::new(),
            instructions: None,
        })
    }

    /// Add a field to extract.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set extraction instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    fn validate(&self) -> ClientResult<()> {
        parse_web_url(self.url.as_str())?;
        for field in &self.fields {
            require_non_empty("field name", field)?;
        }
        Ok(())
    }
}

impl CorvidClient {
    /// Extract structured data from a web page.
    ///
    /// Returns the `data` object as the API produced it; its shape follows
    /// the requested fields.
    pub async fn extract_web_data(&self, request: ExtractionRequest) -> ClientResult<Value> {
        request.validate()?;
        let body = serde_json::to_value(&request)?;
        self.call_field(ApiRequest::new(Method::POST, ["extract"]).json(body), "data")
            .await
    }

    /// Fetch the readable text of a web page.
    pub async fn extract_page_text(&self, url: &str) -> ClientResult<String> {
        let url = parse_web_url(url)?;
        let request =
            ApiRequest::new(Method::POST, ["extract", "text"]).form([("url", url.as_str())]);
        self.call_field(request, "text").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::transport::{MemoryTransport, RequestBody};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_extract_web_data() {
        let transport = Arc::new(MemoryTransport::new());
        transport.push_response(json!({"data": {"title": "Pricing", "price": "$10"}}));
        let client = CorvidClient::with_transport(transport.clone());

        let data = client
            .extract_web_data(
                ExtractionRequest::new("https://example.com/pricing")
                    .unwrap()
                    .with_field("title")
                    .with_field("price"),
            )
            .await
            .unwrap();
        assert_eq!(data, json!({"title": "Pricing", "price": "$10"}));

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.body,
            RequestBody::Json(json!({
                "url": "https://example.com/pricing",
                "fields": ["title", "price"]
            }))
        );
    }

    #[tokio::test]
    async fn test_extract_page_text_is_form_encoded() {
        let transport = Arc::new(MemoryTransport::new());
        transport.push_response(json!({"text": "Welcome"}));
        let client = CorvidClient::with_transport(transport.clone());

        let text = client.extract_page_text("https://example.com").await.unwrap();
        assert_eq!(text, "Welcome");

        let request = transport.last_request().unwrap();
        assert_eq!(request.path(), "/extract/text");
        assert_eq!(
            request.body,
            RequestBody::Form(vec![("url".into(), "https://example.com/".into())])
        );
    }

    #[tokio::test]
    async fn test_invalid_url_never_sent() {
        let transport = Arc::new(MemoryTransport::new());
        let client = CorvidClient::with_transport(transport.clone());

        let err = client.extract_page_text("example.com").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(transport.requests().is_empty());
    }
}
