//! Trace query endpoint

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::data::storage::InMemoryStorage;

#[derive(Clone)]
pub struct TracesState {
    pub storage: Arc<InMemoryStorage>,
}

pub fn routes(storage: Arc<InMemoryStorage>) -> Router {
    Router::new()
        .route("/api/v2/trace/{trace_id}", get(get_trace))
        .with_state(TracesState { storage })
}

/// Stored v2 spans of one trace
pub async fn get_trace(
    State(state): State<TracesState>,
    Path(trace_id): Path<String>,
) -> Response {
    let spans = state.storage.get_trace(&trace_id);
    if spans.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("Trace {} not found", trace_id),
        )
            .into_response();
    }
    Json(spans).into_response()
}
