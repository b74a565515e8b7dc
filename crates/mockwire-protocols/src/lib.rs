//! # mockwire Protocols
//!
//! Protocol front-ends of the mock pipeline:
//!
//! - [`http`]: route matching, request normalization and JSON responses
//! - [`grpc`]: descriptor-driven codec, unary dispatch and server reflection
//!
//! Both sides hand a [`mockwire_core::MockRequest`] to a
//! [`mockwire_scripting::ScriptEvaluator`] and encode whatever it exports.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod grpc;
pub mod http;
pub mod request_id;
pub mod response;

pub use grpc::{GrpcDispatcher, MethodTable};
pub use http::HttpMockHandler;
pub use response::{Body, ResponseBuilder};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::grpc::{GrpcDispatcher, MethodTable};
    pub use crate::http::HttpMockHandler;
    pub use crate::response::{Body, ResponseBuilder};
}
