//! Round-robin request dispatch.
//!
//! # Data Flow
//! ```text
//! /route request
//!     → BackendSelector::next_backend()      (500 on NoBackendsAvailable)
//!     → TargetTemplate::resolve()
//!     → Forwarder::forward()                 (502 on ForwardingFailed)
//!     → relay(): first chunk read before headers are committed
//!                 (500 on StreamingFailed), rest streamed through
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response as HttpResponse},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures_util::{stream, StreamExt, TryStreamExt};

use crate::http::request::request_id_of;
use crate::load_balancer::BackendSelector;
use crate::observability::metrics;
use crate::proxy::client::copy_end_to_end;
use crate::proxy::{Forwarder, ProxyError, TargetTemplate};

/// Route the front door exposes for dispatched traffic.
pub const DISPATCH_ROUTE: &str = "/route";

/// Binds a selector and a forwarder into the `/route` handler.
#[derive(Debug, Clone)]
pub struct ProxyDispatcher {
    selector: Arc<dyn BackendSelector>,
    forwarder: Arc<dyn Forwarder>,
    targets: TargetTemplate,
}

impl ProxyDispatcher {
    pub fn new(
        selector: Arc<dyn BackendSelector>,
        forwarder: Arc<dyn Forwarder>,
        targets: TargetTemplate,
    ) -> Self {
        Self {
            selector,
            forwarder,
            targets,
        }
    }

    /// Router serving `/route` for any method.
    pub fn routes(self) -> Router {
        Router::new()
            .route(DISPATCH_ROUTE, any(dispatch_handler))
            .with_state(self)
    }

    /// Handle one request end to end. Failures become status codes here.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();
        let request_id = request_id_of(&request);

        let backend = match self.selector.next_backend() {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Backend selection failed");
                metrics::record_request(&method, e.status().as_u16(), "none", start);
                return e.into_response();
            }
        };

        tracing::info!(request_id = %request_id, backend = %backend, "Routed request to backend");

        let result = match self.targets.resolve(&backend, request.uri().query()) {
            Ok(target) => match self.forwarder.forward(request, target).await {
                Ok(upstream) => relay(upstream, &backend).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    backend = %backend,
                    error = %e,
                    "Dispatch failed"
                );
                e.into_response()
            }
        };

        metrics::record_request(&method, response.status().as_u16(), &backend, start);
        response
    }
}

async fn dispatch_handler(
    State(dispatcher): State<ProxyDispatcher>,
    request: Request<Body>,
) -> Response {
    dispatcher.dispatch(request).await
}

/// Relay a backend response to the caller.
///
/// The first body chunk is pulled before the headers are handed to the
/// server, so an upstream that dies immediately still yields a clean 500.
/// Anything failing after that point can only truncate the stream.
async fn relay(upstream: HttpResponse<Body>, backend: &str) -> Result<Response, ProxyError> {
    let (parts, body) = upstream.into_parts();
    let mut data = body.into_data_stream();

    let first = match data.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => {
            return Err(ProxyError::StreamingFailed {
                backend: backend.to_string(),
                reason: e.to_string(),
            })
        }
        None => None,
    };

    let backend_id = backend.to_string();
    let rest = data.inspect_err(move |e| {
        tracing::error!(backend = %backend_id, error = %e, "Response stream truncated after headers were sent");
    });
    let body = Body::from_stream(stream::iter(first.map(Ok)).chain(rest));

    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    copy_end_to_end(&parts.headers, response.headers_mut());
    Ok(response)
}
