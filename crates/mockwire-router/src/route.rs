//! Route definition

use http::Method;
use mockwire_core::{Error, MockDefinition, MockId, Result};
use std::sync::Arc;

/// A served HTTP route
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP method
    pub method: Method,

    /// Path pattern (e.g., "/users/:id")
    pub path: String,

    /// Mock answering the route
    pub mock: Arc<MockDefinition>,
}

impl Route {
    /// Build the route for an HTTP mock
    pub fn from_mock(mock: Arc<MockDefinition>) -> Result<Self> {
        let id = match &mock.id {
            MockId::Http(id) => id,
            MockId::Grpc(id) => {
                return Err(Error::Internal(format!(
                    "gRPC mock '{}' cannot be routed over HTTP",
                    id
                )))
            }
        };

        let method = Method::from_bytes(id.method.as_bytes())
            .map_err(|e| Error::Discovery(format!("{}: invalid method: {}", id, e)))?;

        // Validate path
        if !id.path.starts_with('/') {
            return Err(Error::Discovery(format!("{}: path must start with '/'", id)));
        }

        Ok(Route {
            method,
            path: id.path.clone(),
            mock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockwire_core::{GrpcMethodId, HttpRouteId};

    fn mock(id: MockId) -> Arc<MockDefinition> {
        Arc::new(MockDefinition::new(id, "#{}", "mock.rhai"))
    }

    #[test]
    fn test_route_from_mock() {
        let route = Route::from_mock(mock(MockId::Http(HttpRouteId::new("GET", "/users/:id"))))
            .unwrap();

        assert_eq!(route.method, Method::GET);
        assert_eq!(route.path, "/users/:id");
        assert_eq!(route.mock.name(), "GET /users/:id");
    }

    #[test]
    fn test_route_invalid_path() {
        let result = Route::from_mock(mock(MockId::Http(HttpRouteId::new("GET", "users"))));
        assert!(result.is_err());
    }

    #[test]
    fn test_route_rejects_grpc_mock() {
        let result = Route::from_mock(mock(MockId::Grpc(GrpcMethodId::new("a", "B", "C"))));
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
