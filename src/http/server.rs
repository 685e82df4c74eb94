//! HTTP server task.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, content type, signature, access log)
//! - Bind to the configured address when the task starts
//! - Stop accepting and finish in-flight requests once cancelled

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::{header::CONTENT_TYPE, header::InvalidHeaderName, HeaderName},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{SecurityConfig, ServerConfig};
use crate::http::middleware::{
    access_log, require_json, save_body, verify_signature, BodyLimit, BufferedBody,
    SignatureVerifier,
};
use crate::lifecycle::{Task, TaskFailure};
use crate::security::Signer;

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("invalid signature header: {0}")]
    InvalidHeader(#[from] InvalidHeaderName),
}

/// HTTP server run as an orchestrated task.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, security: &SecurityConfig) -> Result<Self, ServerError> {
        let verifier = Arc::new(SignatureVerifier {
            signer: security.hmac_key.as_deref().map(Signer::new),
            header: HeaderName::from_bytes(security.signature_header.as_bytes())?,
            body_limit: config.body_limit_bytes,
        });

        let router = Self::build_router(&config, verifier);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, verifier: Arc<SignatureVerifier>) -> Router {
        let limit = BodyLimit(config.body_limit_bytes);

        // Layers run bottom-up: access log first, save_body last.
        let echo = post(echo_handler)
            .layer(from_fn_with_state(limit, save_body))
            .layer(from_fn_with_state(verifier, verify_signature))
            .layer(from_fn(require_json))
            .layer(from_fn_with_state(limit, access_log));

        Router::new()
            .route("/", get(root_handler))
            .route("/echo", echo)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The router this server serves, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[async_trait]
impl Task for HttpServer {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskFailure> {
        let address = &self.config.bind_address;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;

        if let Ok(local) = listener.local_addr() {
            tracing::info!(address = %local, "HTTP server starting");
        }

        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Server exited");
        Ok(())
    }
}

async fn root_handler() -> &'static str {
    "ok"
}

async fn echo_handler(Extension(BufferedBody(body)): Extension<BufferedBody>) -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], body)
}
