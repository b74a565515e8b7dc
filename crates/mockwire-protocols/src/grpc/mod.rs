//! gRPC mock handling
//!
//! Unary calls are decoded against the method's input descriptor, turned
//! into a [`MockRequest`] and the script export is encoded back into the
//! output message type, or returned as a status when the script exported
//! an `error`.

pub mod codec;
pub mod dispatcher;
pub mod reflection;

pub use codec::DynamicCodec;
pub use dispatcher::{unimplemented_response, GrpcDispatcher, MethodHandler, MethodTable};

use mockwire_core::{Error, MockError, MockRequest, Result, Value};
use mockwire_schema::prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use mockwire_schema::{message_to_value, value_to_message};
use std::collections::BTreeMap;
use tonic::metadata::{KeyAndValueRef, MetadataMap};
use tonic::{Code, Status};

/// Build the uniform request for a unary call
///
/// Binary (`-bin`) metadata is skipped and the first value wins per key.
pub fn normalize_request(metadata: &MetadataMap, message: &DynamicMessage) -> Result<MockRequest> {
    let mut entries = BTreeMap::new();
    for entry in metadata.iter() {
        if let KeyAndValueRef::Ascii(key, value) = entry {
            if let Ok(value) = value.to_str() {
                entries
                    .entry(key.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
    }

    let body = message_to_value(message).map_err(|e| {
        Error::RequestDecode(format!(
            "cannot convert {}: {}",
            message.descriptor().full_name(),
            e
        ))
    })?;

    Ok(MockRequest::grpc(entries, body))
}

/// Build the response message from an exported body
pub fn encode_body(output: &MessageDescriptor, body: &Value) -> Result<DynamicMessage> {
    value_to_message(output, body).map_err(|e| {
        Error::ResponseEncode(format!("cannot encode {}: {}", output.full_name(), e))
    })
}

/// Status for an explicit script `error`
pub fn mock_status(error: &MockError) -> Status {
    Status::new(Code::from_i32(error.code), error.message.clone())
}

/// Status for a pipeline failure
pub fn status_from_error(err: &Error) -> Status {
    Status::new(Code::from_i32(err.to_grpc_code()), err.to_string())
}
