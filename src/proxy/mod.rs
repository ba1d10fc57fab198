//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! front door /route
//!     → dispatcher.rs (select backend, map failures to status codes)
//!     → target.rs (backend id → http://{host}:{id}/mirror?{query})
//!     → client.rs (replay method, headers, body under a timeout)
//!     → dispatcher.rs (relay status, headers, streamed body)
//! ```

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod target;

pub use client::{Forwarder, HttpForwarder};
pub use dispatcher::{ProxyDispatcher, DISPATCH_ROUTE};
pub use error::ProxyError;
pub use target::{TargetTemplate, FORWARD_ROUTE};
