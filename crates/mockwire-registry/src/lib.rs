//! # mockwire Registry
//!
//! Turns mock directories into the set of routes and methods to serve.
//!
//! - [`discovery`] maps the directory convention to mock identifiers
//! - [`binder`] pairs gRPC scripts with compiled schema methods
//! - [`MockRegistry`] runs both once at startup

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod binder;
pub mod discovery;
pub mod registry;

pub use binder::{bind, BoundMock};
pub use discovery::{
    discover_grpc, discover_http, GrpcDiscovery, DEFAULT_WILDCARD_TOKEN, SCRIPT_EXTENSION,
};
pub use registry::{MockRegistry, RegistryOptions};
