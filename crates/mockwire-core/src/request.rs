//! Uniform request model

use crate::mock::Protocol;
use crate::value::{Map, Value};
use std::collections::BTreeMap;

/// Protocol-neutral request handed to a mock script
///
/// Built fresh for every inbound call and never mutated afterwards; scripts
/// receive a copy through [`MockRequest::to_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// Protocol the request arrived on
    pub protocol: Protocol,
    /// Headers (HTTP) or call metadata (gRPC); first value wins per key
    pub metadata: BTreeMap<String, String>,
    /// Path and query parameters (HTTP only)
    pub params: BTreeMap<String, String>,
    /// Decoded request body
    pub body: Value,
}

impl MockRequest {
    /// Create an HTTP request
    pub fn http(
        headers: BTreeMap<String, String>,
        params: BTreeMap<String, String>,
        body: Value,
    ) -> Self {
        Self {
            protocol: Protocol::Http,
            metadata: headers,
            params,
            body,
        }
    }

    /// Create a gRPC request
    pub fn grpc(metadata: BTreeMap<String, String>, body: Value) -> Self {
        Self {
            protocol: Protocol::Grpc,
            metadata,
            params: BTreeMap::new(),
            body,
        }
    }

    /// Get a header / metadata entry
    pub fn header(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Get a path parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Script-facing representation
    ///
    /// HTTP: `{headers, params, body}`. gRPC: `{metadata, body}`.
    pub fn to_value(&self) -> Value {
        let strings = |m: &BTreeMap<String, String>| -> Value {
            Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )
        };

        let mut map = Map::new();
        match self.protocol {
            Protocol::Http => {
                map.insert("headers".to_string(), strings(&self.metadata));
                map.insert("params".to_string(), strings(&self.params));
            }
            Protocol::Grpc => {
                map.insert("metadata".to_string(), strings(&self.metadata));
            }
        }
        map.insert("body".to_string(), self.body.clone());
        Value::Map(map)
    }
}
