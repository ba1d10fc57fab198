//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP listener (one per unit)
//!     → server.rs (Axum setup, unit lifecycle)
//!     → request.rs (assign / propagate x-request-id)
//!     → routes: health (every unit)
//!               mirror.rs (backend units)
//!               proxy::dispatcher (front door)
//! ```

pub mod mirror;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{ServerKind, ServerUnit, UnitError, UnitHandle, UnitState};
