//! Outbound HTTP client.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → log.rs (request line, body, non-200 response bodies)
//!     → timeout (per request)
//!     → gzip.rs (optional body compression)
//!     → sign.rs (optional HMAC header over the bytes actually sent)
//!     → hyper-util legacy client
//! ```
//!
//! Each stage is a tower layer so callers can assemble their own stack.

pub mod gzip;
pub mod log;
pub mod poller;
pub mod sign;

use axum::body::Body;
use axum::http::{header::InvalidHeaderName, uri::InvalidUri, HeaderName, Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tower::util::BoxCloneService;
use tower::{BoxError, ServiceBuilder};

use crate::config::{ClientConfig, SecurityConfig};
use crate::security::Signer;

pub use gzip::GzipRequestLayer;
pub use log::LogRequestLayer;
pub use poller::Poller;
pub use sign::SignRequestLayer;

/// The composed outbound service.
pub type OutboundClient = BoxCloneService<Request<Body>, Response<Body>, BoxError>;

/// Error type for client setup and the polling task.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid target URI: {0}")]
    InvalidTarget(#[from] InvalidUri),
    #[error("invalid signature header: {0}")]
    InvalidHeader(#[from] InvalidHeaderName),
    #[error("failed to build request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("poller has already run")]
    AlreadyRan,
}

/// Assemble the outbound stack from configuration.
pub fn build_client(
    client: &ClientConfig,
    security: &SecurityConfig,
) -> Result<OutboundClient, ClientError> {
    let signing = match security.hmac_key.as_deref() {
        Some(key) => {
            let header = HeaderName::from_bytes(security.signature_header.as_bytes())?;
            Some(SignRequestLayer::new(Signer::new(key), header))
        }
        None => None,
    };

    let http = Client::builder(TokioExecutor::new()).build_http::<Body>();

    let service = ServiceBuilder::new()
        .layer(LogRequestLayer::new())
        .timeout(client.request_timeout())
        .option_layer(client.compress.then(GzipRequestLayer::new))
        .option_layer(signing)
        .map_err(|e: hyper_util::client::legacy::Error| BoxError::from(e))
        .service(http);

    tracing::debug!(
        compress = client.compress,
        signed = security.hmac_key.is_some(),
        timeout = ?client.request_timeout(),
        "Outbound client built"
    );

    Ok(BoxCloneService::new(service))
}
