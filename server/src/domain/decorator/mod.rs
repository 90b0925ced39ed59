//! Span decorators
//!
//! A decorator sees each accepted request's headers and spans after sampling
//! and before storage, and returns the spans to store. Decorators declare the
//! schema versions they handle; the collector only routes matching batches to
//! them.
//!
//! `decorate` has no error channel. A decorator that cannot do its job
//! returns its input.

mod enrich;
mod pod_key;

pub use enrich::Enrichment;
pub use pod_key::PodKeyDecorator;

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;

use super::spans::{SchemaVersion, SpanBatch};
use crate::core::constants::POD_KEY_HEADER;

#[async_trait]
pub trait SpanDecorator: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_schema(&self, version: SchemaVersion) -> bool;

    async fn decorate(&self, request: &RequestInfo, spans: SpanBatch) -> SpanBatch;
}

/// Request metadata visible to decorators
///
/// Header names are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    headers: HashMap<String, String>,
}

impl RequestInfo {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        Self { headers }
    }

    /// Build from HTTP headers. Values that are not valid UTF-8 are dropped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        )
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Trimmed pod key header value, `None` when missing or blank
    pub fn pod_key(&self) -> Option<&str> {
        self.header(POD_KEY_HEADER)
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
