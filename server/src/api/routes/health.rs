//! Health check endpoint
//!
//! Reports 503 once the span store has been closed, so load balancers stop
//! routing during shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::data::storage::InMemoryStorage;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: StorageHealth,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub spans: usize,
    pub traces: usize,
}

pub fn routes(storage: Arc<InMemoryStorage>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(storage)
}

pub async fn health(State(storage): State<Arc<InMemoryStorage>>) -> impl IntoResponse {
    let (code, status) = if storage.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "closed")
    } else {
        (StatusCode::OK, "ok")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            storage: StorageHealth {
                spans: storage.span_count(),
                traces: storage.trace_count(),
            },
        }),
    )
}
