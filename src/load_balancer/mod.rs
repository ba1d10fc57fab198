//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! /route request
//!     → BackendSelector::next_backend()
//!         - round_robin.rs (rotate through the fixed backend set)
//!     → backend identifier handed to the dispatcher
//! ```
//!
//! # Design Decisions
//! - The backend set is fixed at construction; no runtime add/remove
//! - Health results never feed back into selection
//! - The rotation cursor never leaves its selector

pub mod round_robin;

pub use round_robin::RoundRobin;

use crate::proxy::ProxyError;

/// Picks the backend for the next request.
pub trait BackendSelector: Send + Sync + std::fmt::Debug {
    /// Return the next backend identifier, or `NoBackendsAvailable`.
    fn next_backend(&self) -> Result<String, ProxyError>;
}
