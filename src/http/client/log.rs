//! Outbound request/response logging.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::http::{Request, Response, StatusCode};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tower::{BoxError, Layer, Service};

/// Logs every outbound request, plus the body of any non-200 response.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequestLayer;

impl LogRequestLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LogRequestLayer {
    type Service = LogRequest<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LogRequest { inner }
    }
}

#[derive(Debug, Clone)]
pub struct LogRequest<S> {
    inner: S,
}

impl<S, B> Service<Request<Body>> for LogRequest<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response<Body>, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let begin = Instant::now();
            let method = request.method().clone();
            let uri = request.uri().clone();

            let (parts, body) = request.into_parts();
            let sent = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(method = %method, uri = %uri, error = %e, "Error reading request body");
                    return Err(e.into());
                }
            };

            let result = inner
                .call(Request::from_parts(parts, Body::from(sent.clone())))
                .await
                .map_err(Into::<BoxError>::into);

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        method = %method,
                        uri = %uri,
                        took = ?begin.elapsed(),
                        error = %e,
                        body = %String::from_utf8_lossy(&sent),
                        "Request failed"
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                method = %method,
                uri = %uri,
                status = response.status().as_u16(),
                took = ?begin.elapsed(),
                body = %String::from_utf8_lossy(&sent),
                "Request"
            );

            let (parts, body) = response.into_parts();
            if parts.status == StatusCode::OK {
                return Ok(Response::from_parts(parts, Body::new(body)));
            }

            let received = match axum::body::to_bytes(Body::new(body), usize::MAX).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(uri = %uri, error = %e, "Error reading response body");
                    return Err(e.into());
                }
            };

            tracing::info!(
                status = %parts.status,
                uri = %uri,
                body = %String::from_utf8_lossy(&received),
                "Response"
            );

            Ok(Response::from_parts(parts, Body::from(received)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn non_ok_body_is_still_delivered() {
        let upstream = service_fn(|_request: Request<Body>| async {
            Ok::<_, BoxError>(
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from("broken"))
                    .unwrap(),
            )
        });

        let response = LogRequestLayer::new()
            .layer(upstream)
            .oneshot(Request::get("http://upstream/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"broken");
    }

    #[tokio::test]
    async fn upstream_error_is_returned() {
        let upstream = service_fn(|_request: Request<Body>| async {
            Err::<Response<Body>, BoxError>("connection refused".into())
        });

        let err = LogRequestLayer::new()
            .layer(upstream)
            .oneshot(Request::get("http://upstream/").body(Body::empty()).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }
}
