//! Request logging middleware.
//!
//! Every request runs inside an `http_request` span carrying a fresh request id,
//! so auth events logged further down (rejected logins, new accounts) can be
//! correlated with the HTTP exchange. Headers and bodies are never recorded.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Logs method, path, status and latency. 5xx at WARN, everything else at INFO.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();

    // Health probes are noise
    if path == "/health" {
        return next.run(request).await;
    }

    let span = tracing::info_span!(
        "http_request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %path,
    );

    async move {
        let start = Instant::now();
        let response = next.run(request).await;
        let latency_ms = start.elapsed().as_millis();
        let status = response.status();

        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "Request failed");
        } else if status.is_client_error() {
            info!(status = status.as_u16(), latency_ms, "Request rejected");
        } else {
            info!(status = status.as_u16(), latency_ms, "Request completed");
        }

        response
    }
    .instrument(span)
    .await
}
