//! Body replay: buffer once, read as often as needed.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::body::buffer_request;

/// Maximum number of body bytes middleware will buffer.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

/// The request body, captured as a request extension.
#[derive(Debug, Clone)]
pub struct BufferedBody(pub Bytes);

/// Buffer the body into a [`BufferedBody`] extension and restore it.
pub async fn save_body(
    State(BodyLimit(limit)): State<BodyLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (mut request, bytes) = match buffer_request(request, limit).await {
        Ok(buffered) => buffered,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    request.extensions_mut().insert(BufferedBody(bytes));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn_with_state, routing::post, Extension, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn handler_sees_body_twice() {
        let app = Router::new()
            .route(
                "/",
                post(|Extension(saved): Extension<BufferedBody>, body: Bytes| async move {
                    assert_eq!(saved.0, body);
                    body
                }),
            )
            .layer(from_fn_with_state(BodyLimit(1024), save_body));

        let response = app
            .oneshot(Request::post("/").body(Body::from("replay me")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"replay me");
    }

    #[tokio::test]
    async fn oversized_body_is_bad_request() {
        let app = Router::new()
            .route("/", post(|| async { "unreachable" }))
            .layer(from_fn_with_state(BodyLimit(4), save_body));

        let response = app
            .oneshot(Request::post("/").body(Body::from("too long")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
