//! # mockwire Core
//!
//! Core types and error handling shared by every mockwire crate.
//!
//! This crate provides the protocol-neutral pieces of the mock pipeline:
//! - [`Value`], the structured value exchanged between normalization,
//!   scripting and encoding
//! - [`MockRequest`] / [`MockResponse`], the uniform request and response model
//! - [`MockDefinition`] and its protocol-specific identifiers
//! - [`Error`], the error type every per-request failure converts into

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod mock;
pub mod request;
pub mod response;
pub mod value;

pub use error::{grpc_codes, Error, Result};
pub use mock::{GrpcMethodId, HttpRouteId, MockDefinition, MockId, Protocol};
pub use request::MockRequest;
pub use response::{MockError, MockResponse};
pub use value::{Map, Value};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::mock::{GrpcMethodId, HttpRouteId, MockDefinition, MockId, Protocol};
    pub use crate::request::MockRequest;
    pub use crate::response::{MockError, MockResponse};
    pub use crate::value::{Map, Value};
}
