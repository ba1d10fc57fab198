//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Health route (endpoint.rs):
//!     GET <health path> → 200 {"status":"OK"} on every unit
//!
//! Active probing (active.rs):
//!     Periodic timer
//!     → Probe every configured URL concurrently
//!     → Log + gauge per URL
//! ```
//!
//! # Design Decisions
//! - Results are observational only; they never change backend selection
//! - A transport error and a non-2xx status are the same failure
//! - One probe failing never short-circuits the rest of its tick

pub mod active;
pub mod endpoint;

pub use active::{HealthMonitor, HealthRecord, ProbeOutcome};
pub use endpoint::health_routes;
