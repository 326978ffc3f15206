//! Typed endpoint groups.
//!
//! Each module adds methods to [`CorvidClient`](crate::CorvidClient) and
//! defines the request and response types for its endpoints.

pub mod categorization;
pub mod collections;
pub mod extraction;
pub mod generation;
pub mod vision;

use crate::error::{ClientError, ClientResult};
use url::Url;

pub use categorization::{CategorizationRequest, Category};
pub use collections::{
    Collection, CollectionOptions, CollectionQuery, Document, QueryAnswer, QuerySource,
};
pub use extraction::ExtractionRequest;
pub use generation::{Generation, GenerationRequest, Usage};
pub use vision::{ImageSource, ImageToTextRequest};

fn require_non_empty(what: &str, value: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::invalid_request(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn parse_web_url(value: &str) -> ClientResult<Url> {
    let url = Url::parse(value)
        .map_err(|e| ClientError::invalid_request(format!("Invalid URL {:?}: {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::invalid_request(format!(
            "URL must be http or https: {}",
            value
        )));
    }
    Ok(url)
}
