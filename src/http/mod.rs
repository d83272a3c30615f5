//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router assembly, middleware stack, graceful serve)
//!     → request.rs (request ID as early as possible)
//!     → security / limiter middleware
//!     → downstream router
//! ```

pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdLayer, X_REQUEST_ID};
pub use server::{BuildError, GateServer};
