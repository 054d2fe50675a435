use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// HTTP header name for trace ID
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

tokio::task_local! {
    static CURRENT_TRACE_ID: String;
}

/// Trace ID of the request being handled on this task, if any
pub fn current_trace_id() -> Option<String> {
    CURRENT_TRACE_ID.try_with(|id| id.clone()).ok()
}

/// Trace ID of the current request, available from request extensions
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tag each request with a UUID trace ID.
///
/// The ID is recorded on the request span, so every log line emitted while
/// handling the request carries it. It is echoed back in `X-Trace-Id` and
/// reused by error bodies built downstream.
pub async fn trace_id_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let handling = async move {
        let response = next.run(request).await;
        tracing::debug!(status = %response.status(), "Request completed");
        response
    }
    .instrument(span);
    let mut response = CURRENT_TRACE_ID.scope(trace_id.clone(), handling).await;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorResponse, StockroomError};
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use tower::util::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/test",
                get(|Extension(trace_id): Extension<TraceId>| async move {
                    trace_id.as_str().to_string()
                }),
            )
            .route(
                "/missing",
                get(|| async { Err::<(), _>(StockroomError::NotFound("Item 9".to_string())) }),
            )
            .layer(middleware::from_fn(trace_id_middleware))
    }

    #[tokio::test]
    async fn test_error_body_reuses_request_trace_id() {
        let response = app()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);

        let header = response.headers()[TRACE_ID_HEADER].to_str().unwrap().to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.trace_id, header);
    }

    #[test]
    fn test_no_trace_id_outside_request() {
        assert!(current_trace_id().is_none());
    }

    #[tokio::test]
    async fn test_trace_id_in_header_matches_handler() {
        let response = app()
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()[TRACE_ID_HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(header.as_bytes(), &body[..]);
    }

    #[tokio::test]
    async fn test_trace_id_unique_per_request() {
        let app = app();
        let first = app
            .clone()
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let second = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_ne!(first.headers()[TRACE_ID_HEADER], second.headers()[TRACE_ID_HEADER]);
    }
}
