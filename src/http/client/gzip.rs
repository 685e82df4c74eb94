//! Outbound gzip request compression.

use std::io::Write;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{
    header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH},
    HeaderValue, Request,
};
use flate2::{write::GzEncoder, Compression};
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};

/// Gzips request bodies and advertises gzip for responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipRequestLayer;

impl GzipRequestLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for GzipRequestLayer {
    type Service = GzipRequest<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GzipRequest { inner }
    }
}

#[derive(Debug, Clone)]
pub struct GzipRequest<S> {
    inner: S,
}

fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

impl<S> Service<Request<Body>> for GzipRequest<S>
where
    S: Service<Request<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            let bytes = axum::body::to_bytes(body, usize::MAX).await?;
            let compressed = compress(&bytes)?;

            parts.headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts.headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(compressed.len()));

            inner
                .call(Request::from_parts(parts, Body::from(compressed)))
                .await
                .map_err(Into::<BoxError>::into)
        })
    }
}
