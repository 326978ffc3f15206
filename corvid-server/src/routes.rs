//! Routes forwarding requests to the Corvid API.
//!
//! Every route calls exactly one [`CorvidClient`] method. Streaming queries
//! are relayed record by record through [`ndjson_response`].

use crate::error::ApiError;
use crate::ndjson::ndjson_response;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use corvid_client::{
    CategorizationRequest, Category, Collection, CollectionOptions, CollectionQuery,
    CorvidClient, Document, ExtractionRequest, Generation, GenerationRequest, ImageSource,
    ImageToTextRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

type ApiResult<T> = Result<T, ApiError>;

/// Build the router. Mount it under any prefix with [`Router::nest`].
pub fn router(client: CorvidClient) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/{name}",
            get(get_collection).delete(delete_collection),
        )
        .route("/collections/{name}/documents", post(add_documents))
        .route(
            "/collections/{name}/documents/{id}",
            delete(delete_document),
        )
        .route("/collections/{name}/query", post(query_collection))
        .route("/generate", post(generate_text))
        .route("/categorize", post(categorize))
        .route("/image-to-text", post(image_to_text))
        .route("/extract", post(extract_web_data))
        .route("/extract/text", post(extract_page_text))
        .with_state(client)
}

/// Body of `POST /collections`.
#[derive(Debug, Deserialize)]
pub struct CreateCollectionBody {
    /// Collection name.
    pub name: String,
    /// Remaining options.
    #[serde(flatten)]
    pub options: CollectionOptions,
}

/// Body of `POST /collections/{name}/documents`.
#[derive(Debug, Deserialize)]
pub struct AddDocumentsBody {
    /// Documents to add.
    pub documents: Vec<Document>,
}

/// Body of `POST /collections/{name}/query`.
#[derive(Debug, Deserialize)]
pub struct QueryBody {
    /// The query.
    #[serde(flatten)]
    pub query: CollectionQuery,
    /// Relay the answer as NDJSON.
    #[serde(default)]
    pub stream: bool,
}

/// Body of `POST /image-to-text`. Exactly one of `image_url` and `image`.
#[derive(Debug, Deserialize)]
pub struct ImageToTextBody {
    /// Image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Base64 image data.
    #[serde(default)]
    pub image: Option<String>,
    /// MIME type of `image`.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Instructions.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Model name.
    #[serde(default)]
    pub model: Option<String>,
}

impl ImageToTextBody {
    fn into_request(self) -> ApiResult<ImageToTextRequest> {
        let image = match (self.image_url, self.image) {
            (Some(url), None) => ImageSource::url(&url)?,
            (None, Some(data)) => {
                let data = STANDARD
                    .decode(data.trim())
                    .map_err(|e| ApiError::bad_request(format!("image is not valid base64: {}", e)))?;
                let mime_type = self
                    .mime_type
                    .ok_or_else(|| ApiError::bad_request("mime_type is required with image"))?;
                ImageSource::bytes(data, mime_type)
            }
            _ => {
                return Err(ApiError::bad_request(
                    "Provide exactly one of image_url and image",
                ))
            }
        };

        let mut request = ImageToTextRequest::new(image);
        request.prompt = self.prompt;
        request.model = self.model;
        Ok(request)
    }
}

/// Body of `POST /extract/text`.
#[derive(Debug, Deserialize)]
pub struct ExtractTextForm {
    /// Page URL.
    pub url: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_collections(State(client): State<CorvidClient>) -> ApiResult<Json<Value>> {
    let collections = client.list_collections().await?;
    Ok(Json(json!({ "collections": collections })))
}

async fn create_collection(
    State(client): State<CorvidClient>,
    body: Result<Json<CreateCollectionBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Collection>)> {
    let Json(body) = body?;
    let collection = client.create_collection(&body.name, body.options).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

async fn get_collection(
    State(client): State<CorvidClient>,
    Path(name): Path<String>,
) -> ApiResult<Json<Collection>> {
    Ok(Json(client.get_collection(&name).await?))
}

async fn delete_collection(
    State(client): State<CorvidClient>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    client.delete_collection(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_documents(
    State(client): State<CorvidClient>,
    Path(name): Path<String>,
    body: Result<Json<AddDocumentsBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let added = client.add_documents(&name, body.documents).await?;
    Ok(Json(json!({ "added": added })))
}

async fn delete_document(
    State(client): State<CorvidClient>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    client.delete_document(&name, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn query_collection(
    State(client): State<CorvidClient>,
    Path(name): Path<String>,
    body: Result<Json<QueryBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;

    if body.stream {
        debug!(collection = %name, "Relaying streaming query");
        let events = client.query_collection_stream(&name, body.query).await?;
        return Ok(ndjson_response(events));
    }

    let answer = client.query_collection(&name, body.query).await?;
    Ok(Json(answer).into_response())
}

async fn generate_text(
    State(client): State<CorvidClient>,
    body: Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiResult<Json<Generation>> {
    let Json(request) = body?;
    Ok(Json(client.generate_text(request).await?))
}

async fn categorize(
    State(client): State<CorvidClient>,
    body: Result<Json<CategorizationRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let categories: Vec<Category> = client.categorize(request).await?;
    Ok(Json(json!({ "categories": categories })))
}

async fn image_to_text(
    State(client): State<CorvidClient>,
    body: Result<Json<ImageToTextBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let text = client.image_to_text(body.into_request()?).await?;
    Ok(Json(json!({ "text": text })))
}

async fn extract_web_data(
    State(client): State<CorvidClient>,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = body?;
    let data = client.extract_web_data(request).await?;
    Ok(Json(json!({ "data": data })))
}

async fn extract_page_text(
    State(client): State<CorvidClient>,
    form: Result<Form<ExtractTextForm>, FormRejection>,
) -> ApiResult<Json<Value>> {
    let Form(form) = form?;
    let text = client.extract_page_text(&form.url).await?;
    Ok(Json(json!({ "text": text })))
}
