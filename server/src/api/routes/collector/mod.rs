//! Zipkin-compatible span collection endpoints

mod encoding;
mod spans;

pub use encoding::DecodeError;

use std::sync::Arc;

use axum::Router;
use axum::routing::post;

use crate::domain::collector::SpanCollector;

#[derive(Clone)]
pub struct CollectorState {
    pub collector: Arc<SpanCollector>,
}

pub fn routes(collector: Arc<SpanCollector>) -> Router {
    let state = CollectorState { collector };

    Router::new()
        .route("/api/v1/spans", post(spans::post_v1))
        .route("/api/v2/spans", post(spans::post_v2))
        .with_state(state)
}
