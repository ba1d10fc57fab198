//! Fleet orchestration.
//!
//! # Responsibilities
//! - Build every server unit and the health monitor from config
//! - Launch them concurrently, each registered with the completion tracker
//! - Wait for the shutdown trigger, fire the token once, wait for zero
//!
//! # Design Decisions
//! - Units are independent: one failing to bind leaves the rest serving
//! - The report is assembled only after the tracker reaches zero, so every
//!   unit it lists is already terminal

use std::future::Future;
use std::sync::Arc;

use crate::config::validation::{parse_port, validate_config, ValidationError};
use crate::config::{ConfigError, ProxyConfig};
use crate::health::HealthMonitor;
use crate::http::server::{ServerKind, ServerUnit, UnitHandle, UnitState};
use crate::lifecycle::{CompletionTracker, Shutdown};
use crate::load_balancer::RoundRobin;
use crate::proxy::{HttpForwarder, ProxyDispatcher, TargetTemplate};

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub state: UnitState,
    pub error: Option<String>,
}

/// Outcome of a full fleet run.
#[derive(Debug, Clone, Default)]
pub struct FleetReport {
    pub units: Vec<UnitReport>,
}

impl FleetReport {
    pub fn state_of(&self, name: &str) -> Option<UnitState> {
        self.units.iter().find(|u| u.name == name).map(|u| u.state)
    }

    pub fn all_terminal(&self) -> bool {
        self.units.iter().all(|u| u.state.is_terminal())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.state == UnitState::Failed)
    }
}

/// Owns the token, the tracker, the units, and the health monitor.
pub struct Orchestrator {
    units: Vec<ServerUnit>,
    monitor: Option<HealthMonitor>,
    shutdown: Shutdown,
    tracker: CompletionTracker,
}

impl Orchestrator {
    pub fn new(units: Vec<ServerUnit>, monitor: Option<HealthMonitor>) -> Self {
        Self {
            units,
            monitor,
            shutdown: Shutdown::new(),
            tracker: CompletionTracker::new(),
        }
    }

    /// One backend unit per route, the front door, and the health monitor.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let grace = config.grace_period();
        let health_path = config.health_path();
        let bind = &config.server.bind_address;

        let mut units = Vec::with_capacity(config.backend.routes.len() + 1);
        for route in &config.backend.routes {
            let port = port_of("backend.routes", route)?;
            units.push(ServerUnit::new(
                ServerKind::Application { port },
                bind.clone(),
                health_path.clone(),
                grace,
            ));
        }

        let dispatcher = ProxyDispatcher::new(
            Arc::new(RoundRobin::new(config.backend.routes.iter().cloned())),
            Arc::new(HttpForwarder::new(
                config.forward_timeout(),
                config.max_body_bytes,
            )),
            TargetTemplate::new(config.backend.host.clone()),
        );
        units.push(ServerUnit::new(
            ServerKind::RoundRobin {
                port: port_of("server.port", &config.server.port)?,
                dispatcher,
            },
            bind.clone(),
            health_path,
            grace,
        ));

        Ok(Self::new(units, Some(HealthMonitor::from_config(config))))
    }

    /// Token that stops the fleet when fired.
    pub fn shutdown_token(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn tracker(&self) -> CompletionTracker {
        self.tracker.clone()
    }

    pub fn units(&self) -> &[ServerUnit] {
        &self.units
    }

    /// Run the fleet until `trigger` resolves (or the token is fired directly).
    pub async fn run_until<F>(self, trigger: F) -> FleetReport
    where
        F: Future<Output = ()>,
    {
        let Self {
            units,
            monitor,
            shutdown,
            tracker,
        } = self;

        tracing::info!(units = units.len(), "Launching fleet");

        let handles: Vec<UnitHandle> = units
            .into_iter()
            .map(|unit| unit.launch(shutdown.clone(), &tracker))
            .collect();

        if let Some(monitor) = monitor {
            let guard = tracker.register("health-monitor");
            let token = shutdown.clone();
            tokio::spawn(async move {
                monitor.run(token).await;
                guard.deregister();
            });
        }

        tokio::select! {
            _ = trigger => {}
            _ = shutdown.triggered() => {}
        }

        shutdown.trigger();
        tracing::info!(outstanding = tracker.outstanding(), "Waiting for fleet to drain");
        tracker.wait_for_zero().await;

        let mut report = FleetReport::default();
        for handle in handles {
            let name = handle.name().to_string();
            let state = handle.state();
            let error = handle.join().await.err().map(|e| e.to_string());
            report.units.push(UnitReport { name, state, error });
        }

        tracing::info!(
            units = report.units.len(),
            failed = report.failed().count(),
            "Fleet stopped"
        );
        report
    }
}

fn port_of(field: &str, value: &str) -> Result<u16, ConfigError> {
    parse_port(value).ok_or_else(|| {
        ConfigError::Validation(vec![ValidationError::InvalidPort {
            field: field.to_string(),
            value: value.to_string(),
        }])
    })
}
