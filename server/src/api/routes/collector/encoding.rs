//! Span list decoding
//!
//! Bodies are JSON arrays in the Zipkin v1 or v2 form. Gzip content encoding
//! is removed by the decompression layer before handlers see the body.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::domain::spans::{SchemaVersion, SpanBatch};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty request body")]
    Empty,

    #[error("unsupported content type '{0}'")]
    ContentType(String),

    #[error("invalid {version} span list: {source}")]
    Json {
        version: SchemaVersion,
        #[source]
        source: serde_json::Error,
    },
}

/// Reject bodies that declare a non-JSON content type
pub fn check_content_type(headers: &HeaderMap) -> Result<(), DecodeError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };
    let content_type = value.to_str().unwrap_or("");
    if content_type.starts_with("application/json") {
        Ok(())
    } else {
        Err(DecodeError::ContentType(content_type.to_string()))
    }
}

pub fn decode_spans(version: SchemaVersion, body: &Bytes) -> Result<SpanBatch, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }
    SpanBatch::from_json(version, body).map_err(|source| DecodeError::Json { version, source })
}

impl DecodeError {
    /// Error response for a decode failure.
    /// Details are logged, clients get a short message.
    pub fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Failed to decode span request");

        let (status, message) = match self {
            DecodeError::ContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected application/json",
            ),
            DecodeError::Empty => (StatusCode::BAD_REQUEST, "Empty request body"),
            DecodeError::Json { .. } => (StatusCode::BAD_REQUEST, "Failed to decode span list"),
        };
        (status, [(header::CONTENT_TYPE, "text/plain")], message).into_response()
    }
}
