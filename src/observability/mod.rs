//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, units, health monitor
//!     → logging.rs (tracing subscriber, env filter)
//!     → metrics.rs (counters, gauges, histograms → Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request id flows through every dispatch log line
//! - Metrics are optional; recording without an installed recorder is free

pub mod logging;
pub mod metrics;
