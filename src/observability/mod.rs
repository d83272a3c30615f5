//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters behind the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Expected conditions (quota denials, rejected reports) log at debug;
//!   warnings are reserved for backend failure transitions
//! - Request IDs flow through every subsystem via http::request

pub mod logging;
pub mod metrics;
