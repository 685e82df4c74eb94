//! Request body buffering shared by middleware.

use axum::body::{Body, Bytes};
use axum::http::Request;

/// Read the whole body (up to `limit` bytes) and put an identical one back.
pub async fn buffer_request(
    request: Request<Body>,
    limit: usize,
) -> Result<(Request<Body>, Bytes), axum::Error> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await?;
    Ok((Request::from_parts(parts, Body::from(bytes.clone())), bytes))
}
