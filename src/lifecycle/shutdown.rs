//! Process-wide cancellation token.

use std::sync::Arc;
use tokio::sync::watch;

/// Single-shot shutdown signal shared by every unit and the health monitor.
///
/// Backed by a watch channel holding a "fired" flag, so a task that starts
/// waiting after the trigger still observes it immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create an unfired token.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token. Returns `true` only for the call that actually fired it.
    pub fn trigger(&self) -> bool {
        let fired = self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
        if fired {
            tracing::info!("Shutdown triggered");
        }
        fired
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the token has fired.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as `self`, so this cannot observe a close
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn trigger_fires_once() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());

        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(!shutdown.clone().trigger());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn waiters_are_released() {
        let shutdown = Shutdown::new();
        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let token = shutdown.clone();
                tokio::spawn(async move { token.triggered().await })
            })
            .collect();

        shutdown.trigger();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter not released")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn late_observer_sees_fired_token() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_millis(100), shutdown.clone().triggered())
            .await
            .expect("late observer missed the signal");
    }
}
