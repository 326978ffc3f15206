//! Collection management and retrieval-augmented queries.

use super::require_non_empty;
use crate::client::{CorvidClient, EventStream};
use crate::error::{ClientError, ClientResult};
use crate::transport::ApiRequest;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const COLLECTIONS: &str = "collections";

/// A document collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name, unique per account.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of documents stored.
    #[serde(default)]
    pub document_count: u64,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Options for [`CorvidClient::create_collection`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CollectionOptions {
    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A document to add to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-chosen ID; assigned by the API when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Text content.
    pub content: String,
    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Document {
    /// Create a document from its text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            metadata: None,
        }
    }

    /// Set the ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A question asked against a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// The question.
    pub query: String,
    /// Number of documents to retrieve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Model used to write the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Metadata filter applied before retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl CollectionQuery {
    /// Create a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            model: None,
            filter: None,
        }
    }

    /// Set the number of documents to retrieve.
    #[must_use]
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the metadata filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    fn body(&self, stream: bool) -> ClientResult<Value> {
        require_non_empty("query", &self.query)?;
        if self.top_k == Some(0) {
            return Err(ClientError::invalid_request("top_k must be at least 1"));
        }
        let mut body = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut body {
            map.insert("stream".to_string(), Value::Bool(stream));
        }
        Ok(body)
    }
}

/// Answer to a non-streaming collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Generated answer.
    pub answer: String,
    /// Documents the answer was drawn from.
    #[serde(default)]
    pub sources: Vec<QuerySource>,
}

/// A retrieved document backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySource {
    /// Document ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Retrieved passage.
    #[serde(default)]
    pub content: String,
    /// Relevance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CorvidClient {
    /// List all collections.
    pub async fn list_collections(&self) -> ClientResult<Vec<Collection>> {
        self.call_field(ApiRequest::new(Method::GET, [COLLECTIONS]), "collections")
            .await
    }

    /// Create a collection.
    pub async fn create_collection(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> ClientResult<Collection> {
        require_non_empty("collection name", name)?;
        let mut body = serde_json::to_value(&options)?;
        if let Value::Object(map) = &mut body {
            map.insert("name".to_string(), json!(name));
        }
        self.call_as(ApiRequest::new(Method::POST, [COLLECTIONS]).json(body))
            .await
    }

    /// Fetch one collection.
    pub async fn get_collection(&self, name: &str) -> ClientResult<Collection> {
        require_non_empty("collection name", name)?;
        self.call_as(ApiRequest::new(Method::GET, [COLLECTIONS, name]))
            .await
    }

    /// Delete a collection and its documents.
    pub async fn delete_collection(&self, name: &str) -> ClientResult<()> {
        require_non_empty("collection name", name)?;
        self.call(ApiRequest::new(Method::DELETE, [COLLECTIONS, name]))
            .await
            .map(|_| ())
    }

    /// Add documents to a collection, returning how many were stored.
    pub async fn add_documents(&self, name: &str, documents: Vec<Document>) -> ClientResult<usize> {
        require_non_empty("collection name", name)?;
        if documents.is_empty() {
            return Err(ClientError::invalid_request("No documents to add"));
        }
        if let Some(position) = documents.iter().position(|d| d.content.trim().is_empty()) {
            return Err(ClientError::invalid_request(format!(
                "Document {} has no content",
                position
            )));
        }

        debug!(collection = name, count = documents.len(), "Adding documents");
        let request = ApiRequest::new(Method::POST, [COLLECTIONS, name, "documents"])
            .json(json!({ "documents": documents }));
        self.call_field(request, "added").await
    }

    /// Delete one document from a collection.
    pub async fn delete_document(&self, name: &str, document_id: &str) -> ClientResult<()> {
        require_non_empty("collection name", name)?;
        require_non_empty("document id", document_id)?;
        self.call(ApiRequest::new(
            Method::DELETE,
            [COLLECTIONS, name, "documents", document_id],
        ))
        .await
        .map(|_| ())
    }

    /// Ask a question and wait for the complete answer.
    pub async fn query_collection(
        &self,
        name: &str,
        query: CollectionQuery,
    ) -> ClientResult<QueryAnswer> {
        require_non_empty("collection name", name)?;
        let request =
            ApiRequest::new(Method::POST, [COLLECTIONS, name, "query"]).json(query.body(false)?);
        self.call_as(request).await
    }

    /// Ask a question and receive the answer as a stream of NDJSON events.
    ///
    /// Records are yielded as soon as each one is complete. Dropping the
    /// stream closes the upstream connection.
    pub async fn query_collection_stream(
        &self,
        name: &str,
        query: CollectionQuery,
    ) -> ClientResult<EventStream> {
        require_non_empty("collection name", name)?;
        let request =
            ApiRequest::new(Method::POST, [COLLECTIONS, name, "query"]).json(query.body(true)?);
        self.stream(request).await
    }
}
