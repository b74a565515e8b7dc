//! # mockwire Scripting
//!
//! Sandboxed evaluation of mock scripts written in [Rhai](https://rhai.rs).
//!
//! ## Script contract
//!
//! Two variables are in scope:
//!
//! - `request`: `#{ headers, params, body }` for HTTP, `#{ metadata, body }` for gRPC
//! - `console`: `log`, `info`, `trace`, `warn` and `error`, each taking one to
//!   four arguments; the Rhai `print` and `debug` statements log too
//!
//! The script's last expression is the response:
//!
//! ```rhai
//! #{ status: 200, headers: #{ "x-mock": "yes" }, body: #{ id: request.params.id } }
//! ```
//!
//! ## Isolation
//!
//! Every call gets its own engine and scope, and runs on the blocking pool
//! under a wall-clock deadline and an operation budget.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod console;
pub mod convert;
pub mod engine;
pub mod error;
pub mod rhai_engine;

pub use console::Console;
pub use engine::{ScriptEvaluator, ScriptLimits};
pub use error::{Result, ScriptError};
pub use rhai_engine::RhaiEngine;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::engine::{ScriptEvaluator, ScriptLimits};
    pub use crate::error::{Result, ScriptError};
    pub use crate::rhai_engine::RhaiEngine;
}
