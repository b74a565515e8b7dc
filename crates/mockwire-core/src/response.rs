//! Uniform response model

use crate::error::grpc_codes;
use crate::mock::Protocol;
use crate::value::Value;
use std::collections::BTreeMap;

/// Protocol-level failure exported by a gRPC script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError {
    /// gRPC status code (1..=16)
    pub code: i32,
    /// Status message
    pub message: String,
}

/// Protocol-neutral response produced by a mock script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MockResponse {
    /// HTTP status code (HTTP only, defaults to 200)
    pub status: Option<u16>,
    /// Short-circuit status (gRPC only)
    pub error: Option<MockError>,
    /// Response headers (HTTP only)
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Value,
}

impl MockResponse {
    /// Create a response with only a body
    pub fn with_body(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Validate and convert a script export
    ///
    /// HTTP accepts `status`, `headers` and `body`; gRPC accepts `error` and
    /// `body`. Any other key, or a non-map export, is rejected.
    pub fn from_value(protocol: Protocol, value: Value) -> Result<Self, String> {
        let map = match value {
            Value::Map(map) => map,
            other => {
                return Err(format!(
                    "script must return a map, got {}",
                    other.type_name()
                ))
            }
        };

        let mut response = MockResponse::default();
        for (key, value) in map {
            match (protocol, key.as_str()) {
                (_, "body") => response.body = value,
                (Protocol::Http, "status") => response.status = parse_status(&value)?,
                (Protocol::Http, "headers") => response.headers = parse_headers(value)?,
                (Protocol::Grpc, "error") => response.error = parse_error(value)?,
                (_, other) => {
                    return Err(format!(
                        "unexpected key '{}' in {} response",
                        other, protocol
                    ))
                }
            }
        }

        Ok(response)
    }
}

fn parse_status(value: &Value) -> Result<Option<u16>, String> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_i64()
        .filter(|s| (100..=999).contains(s))
        .map(|s| Some(s as u16))
        .ok_or_else(|| format!("status must be an integer in 100..=999, got {}", value))
}

fn parse_headers(value: Value) -> Result<BTreeMap<String, String>, String> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| {
                let rendered = v.to_plain_string().ok_or_else(|| {
                    format!("header '{}' must be a scalar, got {}", k, v.type_name())
                })?;
                Ok((k, rendered))
            })
            .collect(),
        other => Err(format!("headers must be a map, got {}", other.type_name())),
    }
}

fn parse_error(value: Value) -> Result<Option<MockError>, String> {
    let map = match value {
        Value::Null => return Ok(None),
        Value::Map(map) => map,
        other => return Err(format!("error must be a map, got {}", other.type_name())),
    };

    let mut code = None;
    let mut message = String::new();
    for (key, value) in map {
        match key.as_str() {
            "code" => {
                code = value
                    .as_i64()
                    .filter(|c| (1..=i64::from(grpc_codes::UNAUTHENTICATED)).contains(c))
                    .map(|c| c as i32);
                if code.is_none() {
                    return Err(format!("error.code must be a gRPC code in 1..=16, got {}", value));
                }
            }
            "message" => {
                message = value
                    .to_plain_string()
                    .ok_or_else(|| format!("error.message must be a string, got {}", value.type_name()))?;
            }
            other => return Err(format!("unexpected key '{}' in error", other)),
        }
    }

    let code = code.ok_or_else(|| "error.code is required".to_string())?;
    Ok(Some(MockError { code, message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_http_response() {
        let value = map(vec![
            ("status", Value::Int(201)),
            ("headers", map(vec![("x-count", Value::Int(3))])),
            ("body", map(vec![("ok", Value::Bool(true))])),
        ]);

        let response = MockResponse::from_value(Protocol::Http, value).unwrap();
        assert_eq!(response.status, Some(201));
        assert_eq!(response.headers.get("x-count"), Some(&"3".to_string()));
        assert_eq!(response.body.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_grpc_error_response() {
        let value = map(vec![(
            "error",
            map(vec![
                ("code", Value::Int(5)),
                ("message", Value::from("missing")),
            ]),
        )]);

        let response = MockResponse::from_value(Protocol::Grpc, value).unwrap();
        assert_eq!(
            response.error,
            Some(MockError {
                code: 5,
                message: "missing".to_string()
            })
        );
        assert!(response.body.is_null());
    }

    #[test]
    fn test_rejects_non_map_export() {
        let err = MockResponse::from_value(Protocol::Http, Value::Int(1)).unwrap_err();
        assert!(err.contains("map"));
    }

    #[test]
    fn test_rejects_foreign_keys() {
        let grpc_status = map(vec![("status", Value::Int(200))]);
        assert!(MockResponse::from_value(Protocol::Grpc, grpc_status).is_err());

        let http_error = map(vec![("error", Value::Map(Map::new()))]);
        assert!(MockResponse::from_value(Protocol::Http, http_error).is_err());
    }

    #[test]
    fn test_rejects_bad_status_and_code() {
        let status = map(vec![("status", Value::Int(42))]);
        assert!(MockResponse::from_value(Protocol::Http, status).is_err());

        let ok_code = map(vec![("error", map(vec![("code", Value::Int(0))]))]);
        assert!(MockResponse::from_value(Protocol::Grpc, ok_code).is_err());
    }
}
