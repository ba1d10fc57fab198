//! Per-request forwarding target.

use url::Url;

use crate::proxy::ProxyError;

/// Fixed route every forwarded request lands on.
pub const FORWARD_ROUTE: &str = "/mirror";

/// Turns a backend identifier into the URL a request is replayed against.
///
/// Identifiers are either bare ports (`"8081"`, resolved against `host`)
/// or full authorities (`"10.0.0.5:8081"`).
#[derive(Debug, Clone)]
pub struct TargetTemplate {
    host: String,
}

impl TargetTemplate {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Base address of a backend, without the forwarding route.
    pub fn base_url(&self, backend: &str) -> String {
        if backend.contains(':') {
            format!("http://{backend}")
        } else {
            format!("http://{}:{}", self.host, backend)
        }
    }

    /// Build the target URL for `backend`, carrying the inbound query over.
    pub fn resolve(&self, backend: &str, query: Option<&str>) -> Result<Url, ProxyError> {
        let raw = format!("{}{}", self.base_url(backend), FORWARD_ROUTE);
        let mut url = Url::parse(&raw).map_err(|e| ProxyError::ForwardingFailed {
            target: raw.clone(),
            reason: format!("invalid target: {e}"),
        })?;
        url.set_query(query);
        Ok(url)
    }
}
