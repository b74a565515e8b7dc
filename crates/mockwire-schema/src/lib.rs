//! # mockwire Schema
//!
//! Protobuf support for the gRPC side of mockwire:
//!
//! - [`SchemaCompiler`] turns `.proto` sources into introspectable descriptors
//!   (via `protox`, no `protoc` binary needed)
//! - [`codec`] converts between [`mockwire_core::Value`] and
//!   `prost_reflect::DynamicMessage`, field by field

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod codec;
pub mod compiler;
pub mod error;

pub use codec::{decode_message, encode_message, message_to_value, value_to_message};
pub use compiler::{CompiledSchema, SchemaCompiler, PROTO_EXTENSION};
pub use error::CodecError;

// Re-exported so downstream crates agree on one version
pub use prost_reflect;
