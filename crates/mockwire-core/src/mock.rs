//! Mock definitions and their identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Wire protocol a mock is served over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Schema-less HTTP/JSON
    Http,
    /// Schema-typed gRPC/protobuf
    Grpc,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Grpc => write!(f, "grpc"),
        }
    }
}

/// Identifier of an HTTP mock: verb plus route pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpRouteId {
    /// HTTP method as written in the file name (e.g. `GET`)
    pub method: String,
    /// Route pattern with `:name` path parameters (e.g. `/users/:id`)
    pub path: String,
}

impl HttpRouteId {
    /// Create a new route identifier
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for HttpRouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Identifier of a gRPC mock: `(package, service, method)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrpcMethodId {
    /// Protobuf package (dot separated, may be empty)
    pub package: String,
    /// Service name, without package
    pub service: String,
    /// Method name
    pub method: String,
}

impl GrpcMethodId {
    /// Create a new method identifier
    pub fn new(
        package: impl Into<String>,
        service: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            service: service.into(),
            method: method.into(),
        }
    }

    /// Fully-qualified service name (`package.Service`)
    pub fn service_name(&self) -> String {
        if self.package.is_empty() {
            self.service.clone()
        } else {
            format!("{}.{}", self.package, self.service)
        }
    }

    /// HTTP/2 request path the method is served at (`/package.Service/Method`)
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service_name(), self.method)
    }
}

impl fmt::Display for GrpcMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_name(), self.method)
    }
}

/// Protocol-specific mock identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockId {
    /// HTTP route
    Http(HttpRouteId),
    /// gRPC method
    Grpc(GrpcMethodId),
}

impl MockId {
    /// Protocol this identifier belongs to
    pub fn protocol(&self) -> Protocol {
        match self {
            MockId::Http(_) => Protocol::Http,
            MockId::Grpc(_) => Protocol::Grpc,
        }
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockId::Http(id) => id.fmt(f),
            MockId::Grpc(id) => id.fmt(f),
        }
    }
}

/// A discovered mock script
///
/// Immutable once built; shared between request tasks through `Arc`.
#[derive(Debug, Clone)]
pub struct MockDefinition {
    /// Protocol-specific identifier
    pub id: MockId,
    /// Raw script source
    pub script: Arc<str>,
    /// File the script was read from
    pub source_path: PathBuf,
}

impl MockDefinition {
    /// Create a new mock definition
    pub fn new(id: MockId, script: impl Into<Arc<str>>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            script: script.into(),
            source_path: source_path.into(),
        }
    }

    /// Protocol of the mock
    pub fn protocol(&self) -> Protocol {
        self.id.protocol()
    }

    /// Human readable name used in logs and errors
    pub fn name(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grpc_method_paths() {
        let id = GrpcMethodId::new("billing", "Invoices", "Create");
        assert_eq!(id.service_name(), "billing.Invoices");
        assert_eq!(id.path(), "/billing.Invoices/Create");
        assert_eq!(id.to_string(), "billing.Invoices/Create");
    }

    #[test]
    fn test_grpc_method_without_package() {
        let id = GrpcMethodId::new("", "Echo", "Say");
        assert_eq!(id.path(), "/Echo/Say");
    }

    #[test]
    fn test_mock_definition_name() {
        let mock = MockDefinition::new(
            MockId::Http(HttpRouteId::new("GET", "/users/:id")),
            "#{ status: 200 }",
            "mocks/users/__id/GET.rhai",
        );
        assert_eq!(mock.protocol(), Protocol::Http);
        assert_eq!(mock.name(), "GET /users/:id");
    }
}
