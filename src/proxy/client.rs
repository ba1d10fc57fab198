//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Buffer the inbound body so the outbound request owns a complete copy
//! - Replay method, headers and body against the backend target
//! - Bound the upstream call with the configured timeout
//!
//! # Design Decisions
//! - Host and hop-by-hop headers are never replayed
//! - The response is handed back untouched; relaying is the dispatcher's job
//! - Transport failures of any kind collapse into `ForwardingFailed`

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderName, Request, Response, Uri};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::proxy::ProxyError;

/// Headers that describe a single connection and must not cross the proxy.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// True for headers scoped to one hop (including any named in `Connection`).
pub fn is_hop_by_hop(name: &HeaderName, connection_tokens: &[String]) -> bool {
    HOP_BY_HOP.contains(name) || connection_tokens.iter().any(|t| t == name.as_str())
}

fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Copy end-to-end headers from `src` into `dst`, preserving repeated values.
pub fn copy_end_to_end(src: &HeaderMap, dst: &mut HeaderMap) {
    let tokens = connection_tokens(src);
    for (name, value) in src.iter() {
        if is_hop_by_hop(name, &tokens) {
            continue;
        }
        dst.append(name.clone(), value.clone());
    }
}

/// Replays an inbound request against a backend.
pub trait Forwarder: Send + Sync + std::fmt::Debug {
    /// Forward `request` to `target` and return the backend's raw response.
    fn forward(
        &self,
        request: Request<Body>,
        target: Url,
    ) -> BoxFuture<'_, Result<Response<Body>, ProxyError>>;
}

/// Forwarder backed by hyper's pooled client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpForwarder {
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            timeout,
            max_body_bytes,
        }
    }

    async fn forward_inner(
        &self,
        request: Request<Body>,
        target: Url,
    ) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = request.into_parts();

        let bytes = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

        let failed = |reason: String| ProxyError::ForwardingFailed {
            target: target.to_string(),
            reason,
        };

        let uri: Uri = target
            .as_str()
            .parse()
            .map_err(|e| failed(format!("invalid uri: {e}")))?;

        let mut builder = Request::builder().method(parts.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end(&parts.headers, headers);
            // hyper derives Host from the target URI
            headers.remove(header::HOST);
        }

        let outbound = builder
            .body(Body::from(bytes))
            .map_err(|e| failed(e.to_string()))?;

        match tokio::time::timeout(self.timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(_) => Err(failed(format!("timed out after {:?}", self.timeout))),
        }
    }
}

impl Forwarder for HttpForwarder {
    fn forward(
        &self,
        request: Request<Body>,
        target: Url,
    ) -> BoxFuture<'_, Result<Response<Body>, ProxyError>> {
        Box::pin(self.forward_inner(request, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, StatusCode};
    use axum::routing::post;
    use axum::Router;

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut src = HeaderMap::new();
        src.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        src.insert("x-private", HeaderValue::from_static("secret"));
        src.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        src.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        src.append("x-multi", HeaderValue::from_static("one"));
        src.append("x-multi", HeaderValue::from_static("two"));

        let mut dst = HeaderMap::new();
        copy_end_to_end(&src, &mut dst);

        assert!(dst.get(header::CONNECTION).is_none());
        assert!(dst.get("x-private").is_none());
        assert!(dst.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(dst.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(dst.get_all("x-multi").iter().count(), 2);
    }

    #[tokio::test]
    async fn replays_method_headers_and_body() {
        let app = Router::new().route(
            "/mirror",
            post(|headers: HeaderMap, body: String| async move {
                let tag = headers
                    .get("x-tag")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string();
                (StatusCode::ACCEPTED, [("x-echo-tag", tag)], body)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let forwarder = HttpForwarder::new(Duration::from_secs(5), 1024);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/route")
            .header(header::HOST, "front-door.example")
            .header("x-tag", "abc")
            .body(Body::from(r#"{"points":20}"#))
            .unwrap();
        let target = Url::parse(&format!("http://{addr}/mirror")).unwrap();

        let response = forwarder.forward(request, target).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("x-echo-tag").unwrap(), "abc");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"points":20}"#);
    }

    #[tokio::test]
    async fn refused_connection_is_forwarding_failure() {
        // bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let forwarder = HttpForwarder::new(Duration::from_secs(2), 1024);
        let request = Request::builder().uri("/route").body(Body::empty()).unwrap();
        let target = Url::parse(&format!("http://127.0.0.1:{port}/mirror")).unwrap();

        let err = forwarder.forward(request, target).await.unwrap_err();
        assert!(matches!(err, ProxyError::ForwardingFailed { .. }), "{err}");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let app = Router::new().route(
            "/mirror",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let forwarder = HttpForwarder::new(Duration::from_millis(100), 1024);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/route")
            .body(Body::empty())
            .unwrap();
        let target = Url::parse(&format!("http://{addr}/mirror")).unwrap();

        let err = forwarder.forward(request, target).await.unwrap_err();
        match err {
            ProxyError::ForwardingFailed { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn oversized_body_is_invalid_request() {
        let forwarder = HttpForwarder::new(Duration::from_secs(1), 4);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/route")
            .body(Body::from("way more than four bytes"))
            .unwrap();
        let target = Url::parse("http://127.0.0.1:1/mirror").unwrap();

        let err = forwarder.forward(request, target).await.unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(_)));
    }
}
