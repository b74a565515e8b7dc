//! # mockwire Router
//!
//! Trie-based router for the HTTP mock set:
//! - Path parameter extraction (`/users/:id`)
//! - Method-based routing
//! - Static segments win over parameters
//!
//! The router is built once from the discovered mocks and is read-only
//! afterwards, so it can be shared between connections without locking.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod matcher;
pub mod route;
pub mod trie;

pub use matcher::{Match, PathMatcher};
pub use route::Route;
pub use trie::RouteTrie;

use http::Method;
use mockwire_core::{Error, MockDefinition, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Router for managing and matching routes
#[derive(Debug, Default)]
pub struct Router {
    /// Trie for each HTTP method
    tries: HashMap<Method, RouteTrie>,
}

impl Router {
    /// Create a new router
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router serving every mock
    pub fn from_mocks<'a, I>(mocks: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Arc<MockDefinition>>,
    {
        let mut router = Self::new();
        for mock in mocks {
            router.add_route(Route::from_mock(Arc::clone(mock))?)?;
        }
        Ok(router)
    }

    /// Add a route
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let method = route.method.clone();
        let path = route.path.clone();

        self.tries.entry(method.clone()).or_default().insert(route)?;

        tracing::debug!(method = %method, path = %path, "Route added to router");

        Ok(())
    }

    /// Match a request path
    pub fn match_route(&self, method: &Method, path: &str) -> Result<Match> {
        self.tries
            .get(method)
            .and_then(|trie| trie.match_path(path))
            .ok_or_else(|| Error::RouteNotFound(format!("{} {}", method, path)))
    }

    /// Get route count for a method
    pub fn route_count(&self, method: &Method) -> usize {
        self.tries.get(method).map(RouteTrie::len).unwrap_or(0)
    }

    /// Get total route count across all methods
    pub fn total_route_count(&self) -> usize {
        self.tries.values().map(RouteTrie::len).sum()
    }

    /// Get all routes, ordered by path then method
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.tries.values().flat_map(RouteTrie::routes).collect();
        routes.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });
        routes
    }
}
