//! Inbound HMAC signature verification.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::http::body::buffer_request;
use crate::security::Signer;

/// Verification settings for [`verify_signature`].
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    /// Verification is skipped without a key.
    pub signer: Option<Signer>,
    pub header: HeaderName,
    pub body_limit: usize,
}

/// Reject requests whose signature header does not match their body.
///
/// Requests without the header, or with an empty one, pass through unchecked.
pub async fn verify_signature(
    State(verifier): State<Arc<SignatureVerifier>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(signer) = verifier.signer.as_ref() else {
        return next.run(request).await;
    };

    let claimed = match request.headers().get(&verifier.header) {
        Some(value) if !value.is_empty() => value.to_str().unwrap_or_default().to_owned(),
        _ => return next.run(request).await,
    };

    let (request, bytes) = match buffer_request(request, verifier.body_limit).await {
        Ok(buffered) => buffered,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read body for signature check");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    if !signer.verify(&bytes, &claimed) {
        tracing::warn!(header = %verifier.header, "Signature mismatch");
        return StatusCode::BAD_REQUEST.into_response();
    }

    next.run(request).await
}
