//! API server initialization

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::routes::{collector, health, traces};
use crate::core::CoreApp;
use crate::data::storage::InMemoryStorage;
use crate::domain::collector::SpanCollector;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered. Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;
        let shutdown = app.shutdown.clone();

        let router = build_router(
            app.collector.clone(),
            app.storage.clone(),
            app.config.collector.max_body_bytes,
        );

        let host = app.config.server.host.as_str();
        let listener = TcpListener::bind((host, app.config.server.port)).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            schema = %app.collector.schema(),
            decorators = ?app.collector.decorator_names(),
            "Collector listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

/// Assemble the HTTP surface: span ingestion, trace query and health
pub fn build_router(
    collector: Arc<SpanCollector>,
    storage: Arc<InMemoryStorage>,
    max_body_bytes: usize,
) -> Router {
    // Body limit counts decompressed bytes
    let collector_routes = collector::routes(collector)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestDecompressionLayer::new());

    Router::new()
        .merge(collector_routes)
        .merge(health::routes(storage.clone()))
        .merge(traces::routes(storage))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
