//! Text categorization.

use super::require_non_empty;
use crate::client::CorvidClient;
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiRequest;
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Request for [`CorvidClient::categorize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRequest {
    /// Text to categorize.
    pub text: String,
    /// Candidate labels.
    pub categories: Vec<String>,
    /// Score each label independently instead of as one distribution.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multi_label: bool,
}

impl CategorizationRequest {
    /// Create a request.
    pub fn new<I, S>(text: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            multi_label: false,
        }
    }

    /// Enable multi-label scoring.
    #[must_use]
    pub fn multi_label(mut self) -> Self {
        self.multi_label = true;
        self
    }

    fn validate(&self) -> ClientResult<()> {
        require_non_empty("text", &self.text)?;
        if self.categories.is_empty() {
            return Err(ClientError::invalid_request("At least one category is required"));
        }
        for category in &self.categories {
            require_non_empty("category", category)?;
        }
        Ok(())
    }
}

/// One label and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

impl CorvidClient {
    /// Score `text` against the candidate labels, best first.
    pub async fn categorize(&self, request: CategorizationRequest) -> ClientResult<Vec<Category>> {
        request.validate()?;
        let body = serde_json::to_value(&request)?;
        let mut categories: Vec<Category> = self
            .call_field(ApiRequest::new(Method::POST, ["categorize"]).json(body), "categories")
            .await?;
        categories.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(categories)
    }
}
