//! Outbound HMAC request signing.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};

use crate::security::Signer;

/// Adds a hex HMAC-SHA256 of the request body under `header`.
#[derive(Debug, Clone)]
pub struct SignRequestLayer {
    signer: Signer,
    header: HeaderName,
}

impl SignRequestLayer {
    pub fn new(signer: Signer, header: HeaderName) -> Self {
        Self { signer, header }
    }
}

impl<S> Layer<S> for SignRequestLayer {
    type Service = SignRequest<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignRequest {
            inner,
            signer: self.signer.clone(),
            header: self.header.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignRequest<S> {
    inner: S,
    signer: Signer,
    header: HeaderName,
}

impl<S> Service<Request<Body>> for SignRequest<S>
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
        // Use the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let signer = self.signer.clone();
        let header = self.header.clone();

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            let bytes = axum::body::to_bytes(body, usize::MAX).await?;

            let signature = HeaderValue::from_str(&signer.sign(&bytes))?;
            parts.headers.insert(header, signature);

            inner
                .call(Request::from_parts(parts, Body::from(bytes)))
                .await
                .map_err(Into::<BoxError>::into)
        })
    }
}
