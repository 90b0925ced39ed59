//! Span models and schema conversion
//!
//! Spans arrive as either the legacy v1 or the canonical v2 schema. A
//! `SpanBatch` keeps a request's spans in the schema they arrived in and
//! converts on demand for stages that only accept the other one.

pub mod convert;
pub mod v1;
pub mod v2;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire schema of a span list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(SchemaVersion::V1),
            "v2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown span schema '{}'", other)),
        }
    }
}

/// Spans of a single request, in one schema
#[derive(Debug, Clone, PartialEq)]
pub enum SpanBatch {
    V1(Vec<v1::Span>),
    V2(Vec<v2::Span>),
}

impl SpanBatch {
    /// Parse a JSON span list in the given schema
    pub fn from_json(version: SchemaVersion, body: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match version {
            SchemaVersion::V1 => SpanBatch::V1(serde_json::from_slice(body)?),
            SchemaVersion::V2 => SpanBatch::V2(serde_json::from_slice(body)?),
        })
    }

    pub fn version(&self) -> SchemaVersion {
        match self {
            SpanBatch::V1(_) => SchemaVersion::V1,
            SpanBatch::V2(_) => SchemaVersion::V2,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SpanBatch::V1(spans) => spans.len(),
            SpanBatch::V2(spans) => spans.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only spans for which `keep(trace_id, debug)` holds
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, bool) -> bool,
    {
        match self {
            SpanBatch::V1(spans) => spans.retain(|s| keep(&s.trace_id, s.is_debug())),
            SpanBatch::V2(spans) => spans.retain(|s| keep(&s.trace_id, s.is_debug())),
        }
    }

    /// Convert to `target`, a no-op when already there.
    ///
    /// v1 to v2 may grow the batch: shared RPC spans split in two.
    pub fn into_version(self, target: SchemaVersion) -> SpanBatch {
        match (self, target) {
            (SpanBatch::V1(spans), SchemaVersion::V2) => {
                SpanBatch::V2(spans.iter().flat_map(convert::from_v1).collect())
            }
            (SpanBatch::V2(spans), SchemaVersion::V1) => {
                SpanBatch::V1(spans.iter().map(convert::to_v1).collect())
            }
            (batch, _) => batch,
        }
    }

    /// Canonical form of the batch
    pub fn into_v2(self) -> Vec<v2::Span> {
        match self.into_version(SchemaVersion::V2) {
            SpanBatch::V2(spans) => spans,
            SpanBatch::V1(_) => Vec::new(),
        }
    }
}
