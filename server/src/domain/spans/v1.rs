//! Legacy (v1) span model
//!
//! A v1 span may describe both sides of an RPC at once: client and server
//! events live side by side as "core" annotations, and tags are binary
//! annotations that each carry their own endpoint.

use serde::{Deserialize, Serialize};

use super::v2::Endpoint;

/// Client send
pub const CLIENT_SEND: &str = "cs";
/// Client receive
pub const CLIENT_RECV: &str = "cr";
/// Server receive
pub const SERVER_RECV: &str = "sr";
/// Server send
pub const SERVER_SEND: &str = "ss";
/// Message send (producer)
pub const MESSAGE_SEND: &str = "ms";
/// Wire send (producer finished)
pub const WIRE_SEND: &str = "ws";
/// Wire receive (consumer started)
pub const WIRE_RECV: &str = "wr";
/// Message receive (consumer)
pub const MESSAGE_RECV: &str = "mr";

/// Client address binary annotation
pub const CLIENT_ADDR: &str = "ca";
/// Server address binary annotation
pub const SERVER_ADDR: &str = "sa";
/// Message broker address binary annotation
pub const MESSAGE_ADDR: &str = "ma";
/// Local component binary annotation
pub const LOCAL_COMPONENT: &str = "lc";

/// Timestamped event on a v1 span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub timestamp: u64,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
}

impl Annotation {
    pub fn new(timestamp: u64, value: impl Into<String>, endpoint: Option<Endpoint>) -> Self {
        Self {
            timestamp,
            value: value.into(),
            endpoint,
        }
    }
}

/// Value of a binary annotation
///
/// Address annotations (`ca`, `sa`, `ma`) carry `true`; tags carry strings.
/// Any other JSON scalar is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinaryValue {
    Bool(bool),
    String(String),
    Other(serde_json::Value),
}

impl BinaryValue {
    /// Render as a tag value
    pub fn to_tag_value(&self) -> String {
        match self {
            BinaryValue::String(s) => s.clone(),
            BinaryValue::Bool(b) => b.to_string(),
            BinaryValue::Other(v) => v.to_string(),
        }
    }
}

/// Key/value annotation on a v1 span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryAnnotation {
    pub key: String,
    pub value: BinaryValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
}

impl BinaryAnnotation {
    pub fn tag(key: impl Into<String>, value: impl Into<String>, endpoint: Option<Endpoint>) -> Self {
        Self {
            key: key.into(),
            value: BinaryValue::String(value.into()),
            endpoint,
        }
    }

    pub fn address(key: &str, endpoint: Endpoint) -> Self {
        Self {
            key: key.to_string(),
            value: BinaryValue::Bool(true),
            endpoint: Some(endpoint),
        }
    }

    pub fn is_address(&self) -> bool {
        matches!(self.key.as_str(), CLIENT_ADDR | SERVER_ADDR | MESSAGE_ADDR)
    }
}

/// A v1 span
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: String,
    #[serde(default)]
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binary_annotations: Vec<BinaryAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
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

    pub fn annotation(&self, value: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.value == value)
    }

    pub fn binary_annotation(&self, key: &str) -> Option<&BinaryAnnotation> {
        self.binary_annotations.iter().find(|b| b.key == key)
    }
}
