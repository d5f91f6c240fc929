//! Request-logging middleware: one `tracing` span per request carrying a
//! request id, with start/end events (method/path/query/status/duration),
//! mirroring the reference service's logging middleware regardless of
//! whether the handler succeeds or fails.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub async fn request_logging(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().simple().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );
    let _enter = span.enter();

    tracing::info!(query = %query, user_agent = %user_agent, "request started");
    let start = Instant::now();
    drop(_enter);

    let response = next.run(request).await;

    let _enter = span.enter();
    tracing::info!(
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request finished"
    );
    response
}
