//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build GateServer → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close; drain time is bounded
//!   in practice by the request timeout layer
//! - The shared backend handle lives for the whole process and closes
//!   with it, after the drain

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
