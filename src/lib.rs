//! Request admission gate.
//!
//! A tiered, distributed admission layer for a multi-service backend:
//! per-identity rate limiting over a shared counter store with in-process
//! fallback, environment-selected security header policy, and CSP
//! violation-report ingestion.
//!
//! ```text
//! Client → [headers → rate limit] → downstream application
//!          [violation pipeline]   ← browser CSP reports
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod security;

pub use config::schema::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
