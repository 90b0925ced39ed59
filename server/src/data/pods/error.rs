//! Pod metadata error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PodKeyError {
    #[error("Invalid pod key '{key}': expected 3 ':'-separated segments, found {found}")]
    SegmentCount { key: String, found: usize },

    #[error("Invalid pod key '{key}': segment {index} is empty")]
    EmptySegment { key: String, index: usize },
}

/// Failure of a single metadata sub-fetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid container metadata: {0}")]
    Json(#[from] serde_json::Error),
}
