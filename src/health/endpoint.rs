//! Liveness route served by every unit.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Router answering `GET {path}` with `{"status":"OK"}`.
pub fn health_routes(path: &str) -> Router {
    Router::new().route(path, get(health_handler))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_ok_on_configured_path() {
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = health_routes("/healthz").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"OK"}"#);
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = health_routes("/healthz").oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
