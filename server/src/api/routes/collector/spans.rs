//! Span ingestion endpoints

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::CollectorState;
use super::encoding::{check_content_type, decode_spans};
use crate::domain::decorator::RequestInfo;
use crate::domain::spans::SchemaVersion;

pub async fn post_v1(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(state, SchemaVersion::V1, headers, body).await
}

pub async fn post_v2(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    ingest(state, SchemaVersion::V2, headers, body).await
}

async fn ingest(
    state: CollectorState,
    version: SchemaVersion,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = check_content_type(&headers) {
        return e.into_response();
    }

    let batch = match decode_spans(version, &body) {
        Ok(batch) => batch,
        Err(e) => return e.into_response(),
    };
    tracing::trace!(schema = %version, spans = batch.len(), "Decoded span request");

    // Decorators run on the schema the storage keeps
    let batch = batch.into_version(state.collector.schema());
    let request = RequestInfo::from_headers(&headers);

    match state.collector.accept(&request, batch).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Failed to store spans",
        )
            .into_response(),
    }
}
