//! Canonical (v2) span model
//!
//! Mirrors the Zipkin v2 JSON representation: one span per host, a `kind`
//! instead of core annotations, and a flat string tag map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Network context of a node in the service graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            service_name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// RPC role of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Kind {
    Client,
    Server,
    Producer,
    Consumer,
}

/// Timestamped event on a v2 span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub timestamp: u64,
    pub value: String,
}

/// A v2 span
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Epoch microseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Microseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
}

impl Span {
    pub fn new(trace_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    pub fn is_shared(&self) -> bool {
        self.shared.unwrap_or(false)
    }

    /// Returns a copy of this span with `key` set to `value`.
    ///
    /// Identifiers, timing and annotations are carried over untouched.
    pub fn with_tag(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut span = self.clone();
        span.tags.insert(key.into(), value.into());
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zipkin_v2_json() {
        let json = r#"{
            "traceId": "86154a4ba6e91385",
            "parentId": "86154a4ba6e91385",
            "id": "4d1e00c0db9010db",
            "kind": "CLIENT",
            "name": "get",
            "timestamp": 1472470996199000,
            "duration": 207000,
            "localEndpoint": { "serviceName": "frontend", "ipv4": "127.0.0.1" },
            "annotations": [{ "timestamp": 1472470996238000, "value": "ws" }],
            "tags": { "http.path": "/api" }
        }"#;

        let span: Span = serde_json::from_str(json).unwrap();
        assert_eq!(span.trace_id, "86154a4ba6e91385");
        assert_eq!(span.kind, Some(Kind::Client));
        assert_eq!(span.duration, Some(207000));
        assert_eq!(
            span.local_endpoint.as_ref().unwrap().service_name.as_deref(),
            Some("frontend")
        );
        assert_eq!(span.tags.get("http.path").map(String::as_str), Some("/api"));
        assert!(!span.is_debug());
    }

    #[test]
    fn test_serialize_omits_absent_fields() {
        let span = Span::new("a", "b");
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, r#"{"traceId":"a","id":"b"}"#);
    }

    #[test]
    fn test_with_tag_preserves_identifiers() {
        let mut span = Span::new("463ac35c9f6413ad", "72485a3953bb6124");
        span.parent_id = Some("463ac35c9f6413ad".to_string());
        span.timestamp = Some(10);

        let tagged = span.with_tag("k", "v");
        assert_eq!(tagged.trace_id, span.trace_id);
        assert_eq!(tagged.id, span.id);
        assert_eq!(tagged.parent_id, span.parent_id);
        assert_eq!(tagged.timestamp, Some(10));
        assert_eq!(tagged.tags.get("k").map(String::as_str), Some("v"));
        assert!(span.tags.is_empty());
    }

    #[test]
    fn test_with_tag_overwrites() {
        let span = Span::new("a", "b").with_tag("k", "old").with_tag("k", "new");
        assert_eq!(span.tags.len(), 1);
        assert_eq!(span.tags["k"], "new");
    }
}
