//! NDJSON streaming responses.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use corvid_client::{EventStream, NDJSON_CONTENT_TYPE};
use futures::StreamExt;
use tracing::warn;

/// Relay an event stream to the HTTP client as NDJSON.
///
/// Each event is written as one line as soon as upstream completes it. A
/// terminal upstream error aborts the chunked body, so the client sees a
/// truncated response and never an error record. When the client goes away
/// the body is dropped, which drops the upstream connection with it.
pub fn ndjson_response(events: EventStream) -> Response {
    let body = events.map(|item| match item {
        Ok(event) => Ok(event.to_line_bytes()),
        Err(err) => {
            warn!(error = %err, "Aborting NDJSON response");
            Err(err)
        }
    });

    (
        [
            (CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
