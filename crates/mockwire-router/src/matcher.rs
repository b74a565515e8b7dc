//! Path matching utilities

use crate::route::Route;
use mockwire_core::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;

/// Result of a successful route match
#[derive(Debug, Clone)]
pub struct Match {
    /// The matched route
    pub route: Route,

    /// Extracted path parameters
    pub params: BTreeMap<String, String>,
}

/// Path pattern matcher
#[derive(Debug)]
pub struct PathMatcher {
    /// Original pattern
    pattern: String,

    /// Compiled regex (if dynamic)
    regex: Option<Regex>,

    /// Parameter names in order
    param_names: Vec<String>,
}

impl PathMatcher {
    /// Create a new path matcher from a pattern
    ///
    /// Patterns:
    /// - `/users` - static path
    /// - `/users/:id` - dynamic path with parameter
    /// - `/users/:id/posts/:post_id` - multiple parameters
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let param_names: Vec<String> = pattern
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .map(str::to_string)
            .collect();

        if let Some(empty) = param_names.iter().position(String::is_empty) {
            return Err(Error::Discovery(format!(
                "route '{}': parameter {} has no name",
                pattern,
                empty + 1
            )));
        }

        let regex = if param_names.is_empty() {
            None
        } else {
            Some(Self::pattern_to_regex(&pattern)?)
        };

        Ok(Self {
            pattern,
            regex,
            param_names,
        })
    }

    /// Convert path pattern to regex
    fn pattern_to_regex(pattern: &str) -> Result<Regex> {
        let mut regex_str = String::from("^");

        for segment in pattern.split('/') {
            if segment.is_empty() {
                continue;
            }

            regex_str.push('/');

            if segment.starts_with(':') {
                // Named parameter - match anything except /
                regex_str.push_str("([^/]+)");
            } else {
                regex_str.push_str(&regex::escape(segment));
            }
        }

        regex_str.push_str("/?$");

        Regex::new(&regex_str)
            .map_err(|e| Error::Discovery(format!("route '{}': {}", pattern, e)))
    }

    /// Match a path against this pattern
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        match &self.regex {
            // Fast path for static routes
            None => {
                let trimmed = path.trim_end_matches('/');
                let pattern = self.pattern.trim_end_matches('/');
                (trimmed == pattern).then(BTreeMap::new)
            }
            Some(re) => re.captures(path).map(|captures| {
                self.param_names
                    .iter()
                    .enumerate()
                    .filter_map(|(i, name)| {
                        captures
                            .get(i + 1)
                            .map(|m| (name.clone(), m.as_str().to_string()))
                    })
                    .collect()
            }),
        }
    }

    /// Get the pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Is this a static path?
    pub fn is_static(&self) -> bool {
        self.regex.is_none()
    }

    /// Get parameter names
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}
