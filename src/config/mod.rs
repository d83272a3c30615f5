//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → consumed once at startup by GateServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; policy sets are never recomputed
//!   or mutated at request time
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A misconfiguration is fatal at startup, never a degraded runtime

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CounterStoreConfig, Environment, GateConfig, KeyStrategy, RateLimitConfig, ReportingConfig,
    RouteClassConfig, ScopeLimitConfig, SecurityConfig,
};
