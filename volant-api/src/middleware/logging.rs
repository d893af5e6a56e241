//! Per-request correlation ID and structured access logging: every request
//! is wrapped in a tracing span carrying its correlation ID, method, and
//! path, with a completion log line recording status and duration.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use volant_logging::new_correlation_id;

const HEADER_CORRELATION_ID: &str = "x-correlation-id";

/// Assigns (or propagates) a correlation ID, logs the request/response at
/// `info`, and echoes the ID back on the response so a caller can thread
/// it through retries and subsequent requests.
pub async fn correlate_and_log(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(HEADER_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(new_correlation_id);

    request.headers_mut().insert(
        HEADER_CORRELATION_ID,
        HeaderValue::from_str(&correlation_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        http.method = %method,
        http.path = %path,
    );

    let mut response = next.run(request).instrument(span.clone()).await;

    let elapsed_ms = started.elapsed().as_millis();
    let _enter = span.enter();
    tracing::info!(
        http.status = response.status().as_u16(),
        duration_ms = elapsed_ms,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(HEADER_CORRELATION_ID, value);
    }

    response
}
