//! Backend mirror route.
//!
//! Backend instances exist to be forwarding targets: `POST /mirror`
//! checks the payload is JSON and answers with the same bytes.

use axum::{
    body::Bytes,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;

use crate::proxy::FORWARD_ROUTE;

/// Router exposing the mirror route.
pub fn mirror_routes() -> Router {
    Router::new().route(FORWARD_ROUTE, post(mirror_handler))
}

async fn mirror_handler(body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            tracing::debug!(payload = %payload, "Mirroring payload");
            // echo the bytes as received, not a re-encoding
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected mirror payload");
            (StatusCode::BAD_REQUEST, "Invalid JSON").into_response()
        }
    }
}
