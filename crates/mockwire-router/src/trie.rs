//! Trie-based route storage for efficient lookups

use crate::matcher::{Match, PathMatcher};
use crate::route::Route;
use mockwire_core::{Error, Result};
use std::collections::HashMap;

/// Node in the route trie
#[derive(Debug, Default)]
struct TrieNode {
    /// Static children (exact match)
    children: HashMap<String, TrieNode>,

    /// Parameter child (e.g., :id)
    param_child: Option<Box<TrieNode>>,

    /// Route at this node (if terminal) and its matcher
    route: Option<(Route, PathMatcher)>,
}

/// Trie for storing and matching routes of one method
#[derive(Debug, Default)]
pub struct RouteTrie {
    root: TrieNode,
    count: usize,
}

impl RouteTrie {
    /// Create a new route trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route into the trie
    ///
    /// Two patterns differing only in parameter names (`/a/:id` and
    /// `/a/:name`) occupy the same node and conflict.
    pub fn insert(&mut self, route: Route) -> Result<()> {
        let matcher = PathMatcher::new(route.path.clone())?;
        let mut current = &mut self.root;

        for segment in route.path.split('/').filter(|s| !s.is_empty()) {
            current = if segment.starts_with(':') {
                &mut **current.param_child.get_or_insert_with(Box::default)
            } else {
                current.children.entry(segment.to_string()).or_default()
            };
        }

        if let Some((existing, _)) = &current.route {
            return Err(Error::Discovery(format!(
                "routes '{} {}' and '{} {}' conflict",
                existing.method, existing.path, route.method, route.path
            )));
        }

        current.route = Some((route, matcher));
        self.count += 1;

        Ok(())
    }

    /// Match a path against routes in the trie
    ///
    /// Static segments take precedence over parameters.
    pub fn match_path(&self, path: &str) -> Option<Match> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        Self::match_recursive(&self.root, &segments, path)
    }

    fn match_recursive(node: &TrieNode, segments: &[&str], path: &str) -> Option<Match> {
        let Some((segment, rest)) = segments.split_first() else {
            let (route, matcher) = node.route.as_ref()?;
            return matcher.matches(path).map(|params| Match {
                route: route.clone(),
                params,
            });
        };

        node.children
            .get(*segment)
            .and_then(|child| Self::match_recursive(child, rest, path))
            .or_else(|| {
                node.param_child
                    .as_deref()
                    .and_then(|child| Self::match_recursive(child, rest, path))
            })
    }

    /// Get number of routes in the trie
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get all routes from the trie
    pub fn routes(&self) -> Vec<Route> {
        let mut routes = Vec::with_capacity(self.count);
        Self::collect_routes(&self.root, &mut routes);
        routes
    }

    fn collect_routes(node: &TrieNode, routes: &mut Vec<Route>) {
        if let Some((route, _)) = &node.route {
            routes.push(route.clone());
        }

        for child in node.children.values() {
            Self::collect_routes(child, routes);
        }

        if let Some(child) = &node.param_child {
            Self::collect_routes(child, routes);
        }
    }
}
