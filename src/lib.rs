//! Round-robin load-balancing proxy fleet.
//!
//! A front door spreads `/route` traffic across a fixed set of backend
//! mirror instances, a health monitor probes every unit, and an
//! orchestrator runs them all until a termination signal arrives.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use lifecycle::{Orchestrator, Shutdown};
