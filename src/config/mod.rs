//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or in-code defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → shared via Arc with the coordinator and every worker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the balancer starts; the routing seed and the
//!   worker count must not change underneath live sessions
//! - All fields have defaults so `BalancerConfig::default()` is a working
//!   direct-mode setup
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every violation, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BalancerConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RespawnConfig, SyncConfig,
};
pub use validation::{validate_config, ValidationError};
