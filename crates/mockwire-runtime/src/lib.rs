//! # mockwire Runtime
//!
//! Server lifecycle for the mock listeners:
//! - HTTP/1.1 and gRPC (HTTP/2) accept loops on `hyper`
//! - Graceful shutdown with signal handling
//! - In-flight request tracking bounded by the shutdown timeout

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod listener;
pub mod server;
pub mod shutdown;

pub use server::{registry_options, script_limits, MockServer};
pub use shutdown::{InFlight, InFlightGuard, ShutdownSignal, SignalHandler};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::server::MockServer;
    pub use crate::shutdown::{ShutdownSignal, SignalHandler};
}
