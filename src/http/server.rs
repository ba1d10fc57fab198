//! Server units and their lifecycle.
//!
//! # Responsibilities
//! - Build the Axum router for each kind of unit
//! - Bind, serve, and drain within the grace period
//! - Publish every lifecycle transition through a watch channel
//!
//! # Data Flow
//! ```text
//! launch()
//!     → register with the completion tracker
//!     → Starting → bind ──(error)──────────────────────────▶ Failed
//!     → Running  → serve until the shutdown token fires
//!     → ShuttingDown → drain ──(within grace)──────────────▶ Stopped
//!                            ──(grace exceeded, abort)─────▶ Failed
//!     → deregister
//! ```
//!
//! # Design Decisions
//! - Terminal states are absorbing; exactly one is reached per unit
//! - The tracker slot is released only after the terminal state is published
//! - A unit task that dies without a terminal state is published as `Failed`
//! - A failed unit is never restarted

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tower_http::trace::TraceLayer;

use crate::health::health_routes;
use crate::http::mirror::mirror_routes;
use crate::http::request::with_request_id;
use crate::lifecycle::{CompletionGuard, CompletionTracker, Shutdown};
use crate::observability::metrics;
use crate::proxy::ProxyDispatcher;

/// Lifecycle state of a server unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    Created,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

impl UnitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Stopped | UnitState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::Created => "created",
            UnitState::Starting => "starting",
            UnitState::Running => "running",
            UnitState::ShuttingDown => "shutting_down",
            UnitState::Stopped => "stopped",
            UnitState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a unit ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server stopped with an error: {0}")]
    ServeFailed(#[source] std::io::Error),

    #[error("drain did not finish within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("server task ended abnormally: {0}")]
    ShutdownFailed(String),
}

impl From<JoinError> for UnitError {
    fn from(e: JoinError) -> Self {
        UnitError::ShutdownFailed(e.to_string())
    }
}

/// What a unit serves.
#[derive(Debug, Clone)]
pub enum ServerKind {
    /// Backend instance: health + `/mirror`.
    Application { port: u16 },
    /// Front door: health + `/route`.
    RoundRobin {
        port: u16,
        dispatcher: ProxyDispatcher,
    },
}

impl ServerKind {
    pub fn port(&self) -> u16 {
        match self {
            ServerKind::Application { port } | ServerKind::RoundRobin { port, .. } => *port,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ServerKind::Application { .. } => "backend",
            ServerKind::RoundRobin { .. } => "round-robin",
        }
    }
}

/// One bindable HTTP listener with its own routes.
#[derive(Debug, Clone)]
pub struct ServerUnit {
    name: String,
    kind: ServerKind,
    bind_address: String,
    health_path: String,
    grace: Duration,
}

impl ServerUnit {
    pub fn new(
        kind: ServerKind,
        bind_address: impl Into<String>,
        health_path: impl Into<String>,
        grace: Duration,
    ) -> Self {
        Self {
            name: format!("{}:{}", kind.label(), kind.port()),
            kind,
            bind_address: bind_address.into(),
            health_path: health_path.into(),
            grace,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Router with all middleware layers for this unit.
    pub fn router(&self) -> Router {
        let routes = match &self.kind {
            ServerKind::Application { .. } => mirror_routes(),
            ServerKind::RoundRobin { dispatcher, .. } => dispatcher.clone().routes(),
        };

        with_request_id(health_routes(&self.health_path).merge(routes))
            .layer(TraceLayer::new_for_http())
    }

    /// Register with `tracker` and start the unit on its own task.
    pub fn launch(self, shutdown: Shutdown, tracker: &CompletionTracker) -> UnitHandle {
        let guard = tracker.register(self.name.clone());
        let (states, state, history) = StateCell::new(self.name.clone(), guard);
        let local_addr = Arc::new(OnceLock::new());

        let handle_name = self.name.clone();
        let bound = Arc::clone(&local_addr);
        let task = tokio::spawn(self.run(shutdown, states, bound));

        UnitHandle {
            name: handle_name,
            state,
            history,
            local_addr,
            task,
        }
    }

    async fn run(
        self,
        shutdown: Shutdown,
        states: StateCell,
        local_addr: Arc<OnceLock<SocketAddr>>,
    ) -> Result<(), UnitError> {
        let result = self.serve(&shutdown, &states, &local_addr).await;

        match &result {
            Ok(()) => {
                states.set(UnitState::Stopped);
            }
            Err(e) => {
                tracing::error!(unit = %self.name, error = %e, "Unit failed");
                states.set(UnitState::Failed);
            }
        }

        // releases the tracker slot
        drop(states);
        result
    }

    async fn serve(
        &self,
        shutdown: &Shutdown,
        states: &StateCell,
        local_addr: &OnceLock<SocketAddr>,
    ) -> Result<(), UnitError> {
        states.set(UnitState::Starting);

        let app = self.router();
        let addr = format!("{}:{}", self.bind_address, self.kind.port());
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| UnitError::BindFailed {
                addr: addr.clone(),
                source,
            })?;
        if let Ok(bound) = listener.local_addr() {
            let _ = local_addr.set(bound);
        }

        let token = shutdown.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.triggered().await })
                .await
        });

        states.set(UnitState::Running);
        tracing::info!(unit = %self.name, address = %addr, "Unit serving");

        tokio::select! {
            biased;
            _ = shutdown.triggered() => {}
            joined = &mut server => {
                if shutdown.is_triggered() {
                    states.set(UnitState::ShuttingDown);
                }
                return joined?.map_err(UnitError::ServeFailed);
            }
        }

        states.set(UnitState::ShuttingDown);
        tracing::info!(unit = %self.name, grace = ?self.grace, "Unit draining");

        match tokio::time::timeout(self.grace, &mut server).await {
            Ok(joined) => joined?.map_err(UnitError::ServeFailed),
            Err(_) => {
                server.abort();
                Err(UnitError::ShutdownTimeout(self.grace))
            }
        }
    }
}

type History = Arc<Mutex<Vec<UnitState>>>;

/// Publisher side of a unit's state, enforcing absorbing terminal states.
///
/// Owns the unit's tracker slot. Dropping the cell before a terminal state
/// was published (the task panicked or was cancelled) publishes `Failed`
/// first, then releases the slot.
struct StateCell {
    unit: String,
    tx: watch::Sender<UnitState>,
    history: History,
    guard: Option<CompletionGuard>,
}

impl StateCell {
    fn new(
        unit: String,
        guard: CompletionGuard,
    ) -> (Self, watch::Receiver<UnitState>, History) {
        let (tx, rx) = watch::channel(UnitState::Created);
        let history = Arc::new(Mutex::new(vec![UnitState::Created]));
        let cell = Self {
            unit,
            tx,
            history: Arc::clone(&history),
            guard: Some(guard),
        };
        (cell, rx, history)
    }

    fn set(&self, next: UnitState) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            tracing::debug!(unit = %self.unit, from = %current, to = %next, "Unit state changed");
            metrics::record_unit_state(&self.unit, next.as_str());
            self.history
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(next);
            *current = next;
            true
        })
    }
}

impl Drop for StateCell {
    fn drop(&mut self) {
        let terminal = self.tx.borrow().is_terminal();
        if !terminal {
            tracing::error!(unit = %self.unit, "Unit task ended without a terminal state");
            self.set(UnitState::Failed);
        }
        if let Some(guard) = self.guard.take() {
            guard.deregister();
        }
    }
}

/// Observer side of a launched unit.
#[derive(Debug)]
pub struct UnitHandle {
    name: String,
    state: watch::Receiver<UnitState>,
    history: History,
    local_addr: Arc<OnceLock<SocketAddr>>,
    task: JoinHandle<Result<(), UnitError>>,
}

impl UnitHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> UnitState {
        *self.state.borrow()
    }

    /// Every state the unit has passed through, in order.
    pub fn history(&self) -> Vec<UnitState> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Receiver for following state changes.
    pub fn watch(&self) -> watch::Receiver<UnitState> {
        self.state.clone()
    }

    /// Address actually bound, once the listener is up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Wait until the state satisfies `predicate`, returning that state.
    pub async fn wait_for(&self, mut predicate: impl FnMut(UnitState) -> bool) -> UnitState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(|s| predicate(*s)).await.map(|s| *s);
        result.unwrap_or_else(|_| *rx.borrow())
    }

    /// Wait for the unit task and return how it ended.
    pub async fn join(self) -> Result<(), UnitError> {
        self.task.await?
    }
}
