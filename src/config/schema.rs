//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fleet.
//! All types derive Serde traits for deserialization from config files.
//! Field names follow the JSON shape the deployment tooling already produces,
//! hence the odd `healthCheck_ticker_time_seconds` spelling.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the round-robin fleet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Front-door (round-robin) server settings.
    pub server: ServerConfig,

    /// Backend instances and their named endpoints.
    pub backend: BackendConfig,

    /// Key into `backend.endpoints` naming the health-check endpoint.
    pub health_check_endpoint_key: String,

    /// Interval between health-probe ticks, in seconds.
    #[serde(rename = "healthCheck_ticker_time_seconds")]
    pub health_check_interval_secs: u64,

    /// Time allowed for each server to drain on shutdown, in seconds.
    #[serde(rename = "graceful_timeout_seconds")]
    pub graceful_timeout_secs: u64,

    /// Upper bound on the inbound body the forwarder buffers.
    pub max_body_bytes: usize,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let mut endpoints = HashMap::new();
        endpoints.insert(DEFAULT_HEALTH_KEY.to_string(), EndpointConfig::default());

        Self {
            server: ServerConfig::default(),
            backend: BackendConfig {
                endpoints,
                ..BackendConfig::default()
            },
            health_check_endpoint_key: DEFAULT_HEALTH_KEY.to_string(),
            health_check_interval_secs: 30,
            graceful_timeout_secs: 15,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Endpoint-map key used when the config does not name one.
pub const DEFAULT_HEALTH_KEY: &str = "healthcheck";

impl ProxyConfig {
    /// The configured health endpoint, if the key resolves.
    pub fn health_endpoint(&self) -> Option<&EndpointConfig> {
        self.backend.endpoints.get(&self.health_check_endpoint_key)
    }

    /// Path component of the health endpoint (`/health` when unresolvable).
    pub fn health_path(&self) -> String {
        self.health_endpoint()
            .map(|e| e.path())
            .unwrap_or_else(|| "/health".to_string())
    }

    /// Per-probe timeout taken from the health endpoint entry.
    pub fn health_probe_timeout(&self) -> Duration {
        let secs = self.health_endpoint().map(|e| e.timeout).unwrap_or(5);
        Duration::from_secs(secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.graceful_timeout_secs)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout)
    }
}

/// Front-door server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the round-robin front door listens on (string, as in the JSON shape).
    pub port: String,

    /// Per-request forwarding timeout in seconds.
    pub timeout: u64,

    /// Interface every unit binds to.
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: "8080".to_string(),
            timeout: 30,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

/// Backend fleet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Host the proxy and the health monitor use to reach local units.
    pub host: String,

    /// Backend identifiers (ports), in rotation order.
    pub routes: Vec<String>,

    /// Named endpoints, e.g. `healthcheck`.
    pub endpoints: HashMap<String, EndpointConfig>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            routes: Vec::new(),
            endpoints: HashMap::new(),
        }
    }
}

/// A single named endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path (`/health`) or full URL (`http://localhost:8080/health`).
    pub url: String,

    /// Timeout in seconds for requests against this endpoint.
    pub timeout: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "/health".to_string(),
            timeout: 5,
        }
    }
}

impl EndpointConfig {
    /// The path part of `url`; full URLs are reduced to their path.
    ///
    /// Strings that only look like URLs (`localhost:8080/health` parses with
    /// `localhost` as its scheme) are returned untouched so validation can
    /// reject them.
    pub fn path(&self) -> String {
        if self.url.starts_with('/') {
            return self.url.clone();
        }
        match url::Url::parse(&self.url) {
            Ok(parsed) if parsed.cannot_be_a_base() => self.url.clone(),
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => format!("/{}", self.url),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
