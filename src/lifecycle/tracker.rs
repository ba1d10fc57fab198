//! Completion tracking for concurrently running units.
//!
//! # Responsibilities
//! - Count registered tasks that have not yet finished
//! - Let the orchestrator wait until that count reaches zero
//!
//! # Design Decisions
//! - Registration hands out a guard; finishing is dropping (or consuming) it
//! - A guard releases its slot exactly once, whatever path the task exits by
//! - The count lives in a watch channel so waiting needs no polling

use std::sync::Arc;
use tokio::sync::watch;

/// Counter of outstanding tasks.
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    outstanding: Arc<watch::Sender<usize>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            outstanding: Arc::new(tx),
        }
    }

    /// Register a task. The returned guard must live as long as the task.
    pub fn register(&self, name: impl Into<String>) -> CompletionGuard {
        let name = name.into();
        self.outstanding.send_modify(|n| *n += 1);
        tracing::debug!(task = %name, outstanding = self.outstanding(), "Task registered");
        CompletionGuard {
            name,
            tracker: Some(self.clone()),
        }
    }

    /// Number of registered tasks still running.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Resolve once every registered task has deregistered.
    pub async fn wait_for_zero(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    fn release(&self, name: &str) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
        tracing::debug!(task = %name, outstanding = self.outstanding(), "Task completed");
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration slot held by a running task.
#[derive(Debug)]
pub struct CompletionGuard {
    name: String,
    tracker: Option<CompletionTracker>,
}

impl CompletionGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the task complete now rather than at drop.
    pub fn deregister(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.release(&self.name);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
