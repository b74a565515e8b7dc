//! Script evaluator trait and limits

use async_trait::async_trait;
use mockwire_core::{MockDefinition, MockRequest, MockResponse};
use std::fmt;
use std::time::Duration;

/// Resource limits applied to every evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Wall-clock deadline for one evaluation
    pub timeout: Duration,
    /// Operation budget (0 = unlimited)
    pub max_operations: u64,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
    /// Maximum function call nesting depth
    pub max_function_expr_depth: usize,
    /// Maximum string length in bytes
    pub max_string_size: usize,
    /// Maximum array length
    pub max_array_size: usize,
    /// Maximum number of map entries
    pub max_map_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_operations: 1_000_000,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 4 * 1024 * 1024,
            max_array_size: 100_000,
            max_map_size: 100_000,
        }
    }
}

/// Evaluates a mock script against a request
///
/// Implementations must not share mutable state between calls: two
/// concurrent evaluations of the same mock never observe each other.
#[async_trait]
pub trait ScriptEvaluator: Send + Sync + fmt::Debug {
    /// Run `mock`'s script with `request` bound and export its result
    ///
    /// Failures are reported as [`mockwire_core::Error::Script`].
    async fn evaluate(
        &self,
        mock: &MockDefinition,
        request: MockRequest,
    ) -> mockwire_core::Result<MockResponse>;
}
