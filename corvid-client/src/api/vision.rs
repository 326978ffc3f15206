//! Image-to-text.

use super::parse_web_url;
use crate::client::CorvidClient;
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiRequest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use url::Url;

/// Where the image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A publicly reachable image URL.
    Url(Url),
    /// Inline image data, sent base64 encoded.
    Bytes {
        /// Raw image bytes.
        data: Bytes,
        /// MIME type such as `image/png`.
        mime_type: String,
    },
}

impl ImageSource {
    /// Parse an image URL.
    pub fn url(url: &str) -> ClientResult<Self> {
        parse_web_url(url).map(Self::Url)
    }

    /// Inline image data.
    pub fn bytes(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self::Bytes {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    fn validate(&self) -> ClientResult<()> {
        match self {
            Self::Url(_) => Ok(()),
            Self::Bytes { data, mime_type } => {
                if data.is_empty() {
                    return Err(ClientError::invalid_request("Image data is empty"));
                }
                let parsed: mime::Mime = mime_type.parse().map_err(|_| {
                    ClientError::invalid_request(format!("Invalid MIME type: {}", mime_type))
                })?;
                if parsed.type_() != mime::IMAGE {
                    return Err(ClientError::invalid_request(format!(
                        "Not an image MIME type: {}",
                        mime_type
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Request for [`CorvidClient::image_to_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageToTextRequest {
    /// The image.
    pub image: ImageSource,
    /// Optional instructions, e.g. "describe the chart".
    pub prompt: Option<String>,
    /// Model name.
    pub model: Option<String>,
}

impl ImageToTextRequest {
    /// Create a request for an image.
    pub fn new(image: ImageSource) -> Self {
        Self {
            image,
            prompt: None,
            model: None,
        }
    }

    /// Set the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn to_wire(&self) -> WireRequest<'_> {
        let (image_url, image, mime_type) = match &self.image {
            ImageSource::Url(url) => (Some(url.as_str()), None, None),
            ImageSource::Bytes { data, mime_type } => {
                (None, Some(STANDARD.encode(data)), Some(mime_type.as_str()))
            }
        };
        WireRequest {
            image_url,
            image,
            mime_type,
            prompt: self.prompt.as_deref(),
            model: self.model.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

impl CorvidClient {
    /// Describe or transcribe an image.
    pub async fn image_to_text(&self, request: ImageToTextRequest) -> ClientResult<String> {
        request.image.validate()?;
        let body = serde_json::to_value(request.to_wire())?;
        self.call_field(ApiRequest::new(Method::POST, ["image-to-text"]).json(body), "text")
            .await
    }
}
