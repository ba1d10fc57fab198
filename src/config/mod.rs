//! Fleet configuration.
//!
//! # Data Flow
//! ```text
//! --config PATH | $ROUND_ROBIN_CONF_PATH
//!     → loader.rs (.toml → TOML, anything else → JSON)
//!     → validation.rs (ports, durations, health endpoint key; all errors at once)
//!     → ProxyConfig handed to the orchestrator once, never mutated
//! ```
//!
//! # Design Decisions
//! - The health endpoint is found through `health_check_endpoint_key`,
//!   not a hard-coded name
//! - Every field has a default so a minimal file is enough
//! - An empty backend list is valid; the front door then answers 500

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{BackendConfig, EndpointConfig, ObservabilityConfig, ProxyConfig, ServerConfig};
