//! Round-robin load balancing strategy.

use std::sync::Mutex;

use crate::load_balancer::BackendSelector;
use crate::proxy::ProxyError;

/// Round-robin selector over a fixed, ordered set of backend identifiers.
///
/// The cursor always sits in `[0, len)` and is only touched while the
/// guard is held, so N consecutive picks visit each backend exactly once.
#[derive(Debug)]
pub struct RoundRobin {
    backends: Vec<String>,
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new<I, S>(backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            backends: backends.into_iter().map(Into::into).collect(),
            cursor: Mutex::new(0),
        }
    }
}

impl BackendSelector for RoundRobin {
    fn next_backend(&self) -> Result<String, ProxyError> {
        // A poisoned guard still holds a valid cursor; keep rotating.
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());

        if self.backends.is_empty() {
            return Err(ProxyError::NoBackendsAvailable);
        }

        let backend = self.backends[*cursor].clone();
        *cursor = (*cursor + 1) % self.backends.len();
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new(["8081", "8082"]);

        assert_eq!(lb.next_backend().unwrap(), "8081");
        assert_eq!(lb.next_backend().unwrap(), "8082");
        assert_eq!(lb.next_backend().unwrap(), "8081");
    }

    #[test]
    fn full_cycle_visits_each_backend_once_then_repeats() {
        for n in 1..=7 {
            let ids: Vec<String> = (0..n).map(|i| format!("90{i:02}")).collect();
            let lb = RoundRobin::new(ids.clone());

            let cycle: Vec<String> = (0..n).map(|_| lb.next_backend().unwrap()).collect();
            assert_eq!(cycle, ids, "cycle of size {n} out of order");

            // the (N+1)-th pick wraps to the first backend
            assert_eq!(lb.next_backend().unwrap(), ids[0]);
        }
    }

    #[test]
    fn empty_set_never_yields_a_backend() {
        let lb = RoundRobin::new(Vec::<String>::new());
        for _ in 0..3 {
            assert!(matches!(lb.next_backend(), Err(ProxyError::NoBackendsAvailable)));
        }
    }

    #[test]
    fn concurrent_callers_see_exact_distribution() {
        let ids = ["a", "b", "c", "d", "e"];
        let lb = Arc::new(RoundRobin::new(ids));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..20).map(|_| lb.next_backend().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                *counts.entry(id).or_default() += 1;
            }
        }

        assert_eq!(counts.len(), ids.len());
        for id in ids {
            assert_eq!(counts[id], 200, "backend {id} picked {} times", counts[id]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_see_exact_distribution() {
        let lb = Arc::new(RoundRobin::new(["8081", "8082", "8083", "8084", "8085"]));

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let lb = lb.clone();
                tokio::spawn(async move {
                    let mut picks = Vec::with_capacity(20);
                    for _ in 0..20 {
                        picks.push(lb.next_backend().unwrap());
                        tokio::task::yield_now().await;
                    }
                    picks
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for task in tasks {
            for id in task.await.unwrap() {
                *counts.entry(id).or_default() += 1;
            }
        }

        assert!(counts.values().all(|&c| c == 20 * 50 / 5));
    }
}
