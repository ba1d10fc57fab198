//! Errors on the request path and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure while dispatching a `/route` request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The selector has an empty backend set.
    #[error("no backends available")]
    NoBackendsAvailable,

    /// Transport-level failure reaching the backend (refused, timeout, DNS).
    #[error("forwarding to {target} failed: {reason}")]
    ForwardingFailed { target: String, reason: String },

    /// The backend response could not be relayed to the caller.
    #[error("relaying response from {backend} failed: {reason}")]
    StreamingFailed { backend: String, reason: String },

    /// The inbound request could not be buffered for replay.
    #[error("invalid inbound request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoBackendsAvailable => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::ForwardingFailed { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::StreamingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable body text; never includes backend details.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::NoBackendsAvailable => "No backends available",
            ProxyError::ForwardingFailed { .. } => "Error forwarding request",
            ProxyError::StreamingFailed { .. } => "Error reading response body",
            ProxyError::InvalidRequest(_) => "Invalid request body",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
