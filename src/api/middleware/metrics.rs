use crate::api::middleware::request_id::REQUEST_ID_HEADER;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// One structured `request_completed` event per request. Health probes are
/// logged at debug so polling doesn't drown the log.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::warn!(target: "metrics", %method, %path, %request_id, status, latency_ms, "request_completed");
    } else if path == "/health" {
        tracing::debug!(target: "metrics", %method, %path, %request_id, status, latency_ms, "request_completed");
    } else {
        tracing::info!(target: "metrics", %method, %path, %request_id, status, latency_ms, "request_completed");
    }

    response
}
