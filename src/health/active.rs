//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every configured health URL
//! - Log and publish the outcome of each probe
//! - Stop when the shutdown token fires

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::ProxyConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::TargetTemplate;

/// Result of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx response.
    Healthy(StatusCode),
    /// Response arrived with a non-2xx status.
    BadStatus(StatusCode),
    /// The request never produced a response.
    Unreachable(String),
    TimedOut,
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy(_))
    }
}

/// Last known outcome for one URL, recomputed every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub url: String,
    pub outcome: ProbeOutcome,
}

pub struct HealthMonitor {
    urls: Vec<String>,
    interval: Duration,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(urls: Vec<String>, interval: Duration, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            urls,
            interval,
            timeout,
            client,
        }
    }

    /// Probe the front door and every backend on the configured health path.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let template = TargetTemplate::new(config.backend.host.clone());
        let health_path = config.health_path();
        let urls = std::iter::once(&config.server.port)
            .chain(config.backend.routes.iter())
            .map(|id| format!("{}{}", template.base_url(id), health_path))
            .collect();

        Self::new(
            urls,
            config.health_check_interval(),
            config.health_probe_timeout(),
        )
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Tick until `shutdown` fires. The first probe happens one interval in.
    pub async fn run(self, shutdown: Shutdown) {
        tracing::info!(
            interval = ?self.interval,
            targets = self.urls.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // in-flight probes are dropped when shutdown wins
            tokio::select! {
                _ = async {
                    ticker.tick().await;
                    self.check_all().await
                } => {}
                _ = shutdown.triggered() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every URL concurrently and report all outcomes.
    pub async fn check_all(&self) -> Vec<HealthRecord> {
        let records = join_all(self.urls.iter().map(|url| self.probe(url))).await;

        for record in &records {
            let healthy = record.outcome.is_healthy();
            match &record.outcome {
                ProbeOutcome::Healthy(status) => {
                    tracing::info!(url = %record.url, status = %status, "Health check passed")
                }
                ProbeOutcome::BadStatus(status) => {
                    tracing::warn!(url = %record.url, status = %status, "Health check failed: non-success status")
                }
                ProbeOutcome::Unreachable(error) => {
                    tracing::warn!(url = %record.url, error = %error, "Health check failed: connection error")
                }
                ProbeOutcome::TimedOut => {
                    tracing::warn!(url = %record.url, timeout = ?self.timeout, "Health check failed: timeout")
                }
            }
            metrics::record_backend_health(&record.url, healthy);
        }

        records
    }

    async fn probe(&self, url: &str) -> HealthRecord {
        let record = |outcome| HealthRecord {
            url: url.to_string(),
            outcome,
        };

        let request = match Request::builder()
            .method("GET")
            .uri(url)
            .header("user-agent", "roundrobin-proxy-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => return record(ProbeOutcome::Unreachable(e.to_string())),
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => {
                record(ProbeOutcome::Healthy(response.status()))
            }
            Ok(Ok(response)) => record(ProbeOutcome::BadStatus(response.status())),
            Ok(Err(e)) => record(ProbeOutcome::Unreachable(e.to_string())),
            Err(_) => record(ProbeOutcome::TimedOut),
        }
    }
}
