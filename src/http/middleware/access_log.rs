//! Access logging with the request body.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::body::buffer_request;
use crate::http::middleware::save_body::BodyLimit;

/// Log method, URI, status, duration and body once the handler has run.
pub async fn access_log(
    State(BodyLimit(limit)): State<BodyLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let uri = request.uri().clone();
    let method = request.method().clone();

    let (request, bytes) = match buffer_request(request, limit).await {
        Ok(buffered) => buffered,
        Err(e) => {
            tracing::error!(uri = %uri, method = %method, error = %e, "Error reading body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let response = next.run(request).await;

    tracing::info!(
        uri = %uri,
        method = %method,
        status = response.status().as_u16(),
        duration = ?start.elapsed(),
        body = %String::from_utf8_lossy(&bytes),
        "New request"
    );

    response
}
