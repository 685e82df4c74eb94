//! JSON content-type gate.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const APPLICATION_JSON: &[u8] = b"application/json";

/// Reject requests whose `Content-Type` is not exactly `application/json`.
pub async fn require_json(request: Request<Body>, next: Next) -> Response {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes() == APPLICATION_JSON);

    if !is_json {
        tracing::debug!(
            content_type = ?request.headers().get(CONTENT_TYPE),
            "Rejecting non-JSON request"
        );
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    next.run(request).await
}
