//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Config → build units + health monitor → launch all concurrently
//!
//! Shutdown:
//!     signals.rs (SIGTERM/SIGINT) → Shutdown::trigger (shutdown.rs)
//!     → every unit drains within its grace period
//!     → CompletionTracker reaches zero (tracker.rs) → exit
//! ```
//!
//! # Design Decisions
//! - One cancellation token per process, fired at most once
//! - Every task registers before doing work and deregisters exactly once
//! - Failed units are logged and left down; nothing restarts

pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod tracker;

pub use orchestrator::{FleetReport, Orchestrator, UnitReport};
pub use shutdown::Shutdown;
pub use tracker::{CompletionGuard, CompletionTracker};
