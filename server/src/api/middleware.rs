//! HTTP middleware

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;

const MAX_404_BODY_LOG: usize = 64 * 1024;

/// Handle 404 Not Found, logging the request at DEBUG
///
/// Misconfigured tracers often post to the wrong path, so the body is logged
/// alongside method and headers.
pub async fn handle_404(req: Request) -> impl IntoResponse {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return StatusCode::NOT_FOUND;
    }

    let method = req.method().clone();
    let uri = req.uri().clone();
    let headers: serde_json::Map<String, serde_json::Value> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), serde_json::Value::String(v.to_string())))
        })
        .collect();

    let Ok(body) = to_bytes(req.into_body(), MAX_404_BODY_LOG).await else {
        tracing::debug!(%method, %uri, "[404] body unreadable");
        return StatusCode::NOT_FOUND;
    };

    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| match std::str::from_utf8(&body) {
            Ok(text) => serde_json::Value::String(text.to_string()),
            Err(_) => serde_json::Value::String(format!("<binary {} bytes>", body.len())),
        })
    };

    let entry = serde_json::json!({
        "status": 404,
        "method": method.to_string(),
        "url": uri.to_string(),
        "headers": headers,
        "body": body,
    });
    if let Ok(pretty) = serde_json::to_string_pretty(&entry) {
        tracing::debug!("[404]\n{}", pretty);
    }

    StatusCode::NOT_FOUND
}
