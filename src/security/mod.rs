//! Security policy subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing response:
//!     → headers.rs (render the environment's policy set onto the response)
//!
//! POST <report_endpoint>:
//!     → reporting.rs (bound, validate, normalize, log)
//! ```
//!
//! # Design Decisions
//! - Header rendering is additive only; it never rejects a request
//! - Two fully-specified policy sets (dev/prod), selected once at startup
//! - The report endpoint trusts nothing: size ceiling, shape validation,
//!   truncated diagnostics for anything rejected

pub mod headers;
pub mod reporting;

pub use headers::{
    security_headers_middleware, HeaderEngine, PolicyMode, RouteClass, SecurityPolicySet,
};
pub use reporting::{ingest_report, ReportRejection, ViolationPipeline, ViolationReport};
