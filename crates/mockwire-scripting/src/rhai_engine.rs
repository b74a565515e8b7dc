//! Rhai script evaluator

use crate::console::Console;
use crate::convert::{from_dynamic, to_dynamic};
use crate::engine::{ScriptEvaluator, ScriptLimits};
use crate::error::{Result, ScriptError};
use async_trait::async_trait;
use mockwire_core::{MockDefinition, MockRequest, MockResponse};
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use std::time::Instant;
use tracing::{debug, trace, Span};

/// Rhai evaluator
///
/// A new [`Engine`] and [`Scope`] are built for every call, so nothing a
/// script does can leak into another evaluation. Only the limits are shared.
#[derive(Debug, Clone, Default)]
pub struct RhaiEngine {
    limits: ScriptLimits,
}

impl RhaiEngine {
    /// Create an evaluator with the given limits
    pub fn new(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    /// Limits applied to every evaluation
    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    /// Check that a script parses
    pub fn check(&self, script: &str) -> Result<()> {
        Engine::new().compile(script)?;
        Ok(())
    }

    fn build_engine(&self, console: &Console, started: Instant) -> Engine {
        let limits = &self.limits;
        let mut engine = Engine::new();

        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
        engine.set_max_operations(limits.max_operations);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        Console::register(&mut engine);
        console.hook_print(&mut engine);

        let timeout = limits.timeout;
        engine.on_progress(move |_ops| {
            if started.elapsed() >= timeout {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        engine
    }

    /// Evaluate on the current thread
    ///
    /// `span` is the request span console output is attached to.
    pub fn evaluate_blocking(
        &self,
        mock: &MockDefinition,
        request: &MockRequest,
        span: Span,
    ) -> Result<MockResponse> {
        let started = Instant::now();
        let console = Console::new(mock.name(), span);
        let engine = self.build_engine(&console, started);

        let ast = engine.compile(&*mock.script)?;

        let mut scope = Scope::new();
        scope.push("console", console);
        scope.push("request", to_dynamic(request.to_value()));

        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|err| {
                if matches!(*err, EvalAltResult::ErrorTerminated(..)) {
                    ScriptError::timeout(self.limits.timeout.as_millis() as u64)
                } else {
                    ScriptError::from(err)
                }
            })?;

        let value = from_dynamic(result)?;
        MockResponse::from_value(request.protocol, value).map_err(ScriptError::invalid_export)
    }
}

#[async_trait]
impl ScriptEvaluator for RhaiEngine {
    async fn evaluate(
        &self,
        mock: &MockDefinition,
        request: MockRequest,
    ) -> mockwire_core::Result<MockResponse> {
        let evaluator = self.clone();
        let definition = mock.clone();
        let span = Span::current();
        let started = Instant::now();

        trace!(mock = %mock.id, "Evaluating script");

        let result = tokio::task::spawn_blocking(move || {
            evaluator.evaluate_blocking(&definition, &request, span)
        })
        .await
        .unwrap_or_else(|e| Err(ScriptError::panic(e.to_string())));

        debug!(
            mock = %mock.id,
            elapsed_us = started.elapsed().as_micros() as u64,
            ok = result.is_ok(),
            "Script evaluated"
        );

        result.map_err(|e| e.into_error(mock.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockwire_core::{GrpcMethodId, HttpRouteId, MockId, Protocol, Value};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn http_mock(script: &str) -> MockDefinition {
        MockDefinition::new(
            MockId::Http(HttpRouteId::new("GET", "/users/:id")),
            script,
            "users/__id/GET.rhai",
        )
    }

    fn grpc_mock(script: &str) -> MockDefinition {
        MockDefinition::new(
            MockId::Grpc(GrpcMethodId::new("billing", "Invoices", "Get")),
            script,
            "billing/Invoices/Get.rhai",
        )
    }

    fn http_request(id: &str) -> MockRequest {
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), id.to_string());
        let mut headers = BTreeMap::new();
        headers.insert("x-tenant".to_string(), "acme".to_string());
        MockRequest::http(headers, params, Value::Null)
    }

    #[tokio::test]
    async fn test_http_export() {
        let engine = RhaiEngine::default();
        let mock = http_mock(
            r#"
                console.info("fetching user", request.params.id);
                #{
                    status: 201,
                    headers: #{ "x-tenant": request.headers["x-tenant"] },
                    body: #{ id: request.params.id, name: "Ada" }
                }
            "#,
        );

        let response = engine.evaluate(&mock, http_request("42")).await.unwrap();
        assert_eq!(response.status, Some(201));
        assert_eq!(response.headers.get("x-tenant"), Some(&"acme".to_string()));
        assert_eq!(response.body.get("id"), Some(&Value::from("42")));
        assert_eq!(response.body.get("name"), Some(&Value::from("Ada")));
    }

    #[tokio::test]
    async fn test_grpc_error_export() {
        let engine = RhaiEngine::default();
        let mock = grpc_mock(r#"#{ error: #{ code: 5, message: "missing" } }"#);
        let request = MockRequest::grpc(BTreeMap::new(), Value::Null);

        let response = engine.evaluate(&mock, request).await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, 5);
        assert_eq!(error.message, "missing");
        assert!(response.body.is_null());
    }

    #[tokio::test]
    async fn test_grpc_body_sees_request_body() {
        let engine = RhaiEngine::default();
        let mock = grpc_mock(
            r#"
                let total = request.body.amount * 2;
                print(`doubling ${request.body.amount}`);
                #{ body: #{ total: total, tenant: request.metadata.tenant } }
            "#,
        );
        let mut metadata = BTreeMap::new();
        metadata.insert("tenant".to_string(), "acme".to_string());
        let body: Value = [("amount".to_string(), Value::Uint(21))].into_iter().collect();

        let response = engine
            .evaluate(&mock, MockRequest::grpc(metadata, body))
            .await
            .unwrap();
        assert_eq!(response.body.get("total"), Some(&Value::Int(42)));
        assert_eq!(response.body.get("tenant"), Some(&Value::from("acme")));
    }

    #[test]
    fn test_compile_error() {
        let engine = RhaiEngine::default();
        let err = engine
            .evaluate_blocking(&http_mock("#{ status: "), &http_request("1"), Span::none())
            .unwrap_err();
        assert!(matches!(err, ScriptError::CompilationError { .. }));
        assert!(engine.check("#{ status: ").is_err());
        assert!(engine.check("#{ status: 200 }").is_ok());
    }

    #[tokio::test]
    async fn test_runtime_error_is_script_error() {
        let engine = RhaiEngine::default();
        let mock = http_mock(r#"throw "boom";"#);

        let err = engine.evaluate(&mock, http_request("1")).await.unwrap_err();
        assert!(matches!(
            err,
            mockwire_core::Error::Script {
                timed_out: false,
                ..
            }
        ));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_bad_shape() {
        let engine = RhaiEngine::default();
        let request = http_request("1");

        for script in [r#""not a map""#, r#"#{ code: 200 }"#, r#"#{ status: 42 }"#] {
            let err = engine
                .evaluate_blocking(&http_mock(script), &request, Span::none())
                .unwrap_err();
            assert!(matches!(err, ScriptError::InvalidExport { .. }), "{script}: {err}");
        }
    }

    #[test]
    fn test_deadline() {
        let engine = RhaiEngine::new(ScriptLimits {
            timeout: Duration::from_millis(50),
            max_operations: 0,
            ..ScriptLimits::default()
        });
        let mock = http_mock("let x = 0; loop { x += 1; }");

        let err = engine
            .evaluate_blocking(&mock, &http_request("1"), Span::none())
            .unwrap_err();
        assert!(err.is_timeout(), "{err}");
        assert!(matches!(
            err.into_error(mock.name()),
            mockwire_core::Error::Script {
                timed_out: true,
                ..
            }
        ));
    }

    #[test]
    fn test_operation_budget() {
        let engine = RhaiEngine::new(ScriptLimits {
            max_operations: 1_000,
            ..ScriptLimits::default()
        });
        let mock = http_mock("let x = 0; loop { x += 1; }");

        let err = engine
            .evaluate_blocking(&mock, &http_request("1"), Span::none())
            .unwrap_err();
        assert!(matches!(err, ScriptError::RuntimeError { .. }), "{err}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_evaluations_are_isolated() {
        let engine = RhaiEngine::default();
        let mock = http_mock(
            r#"
                let seen = request.params.id;
                request.params.id = "overwritten";
                let counter = 0;
                for i in 0..100 { counter += 1; }
                #{ body: #{ id: seen, counter: counter } }
            "#,
        );

        let calls = (0..32).map(|i| {
            let engine = engine.clone();
            let mock = mock.clone();
            async move {
                let response = engine
                    .evaluate(&mock, http_request(&i.to_string()))
                    .await
                    .unwrap();
                (i, response)
            }
        });

        for (i, response) in futures::future::join_all(calls).await {
            assert_eq!(response.body.get("id"), Some(&Value::from(i.to_string())));
            assert_eq!(response.body.get("counter"), Some(&Value::Int(100)));
        }
    }

    #[test]
    fn test_export_protocol_follows_request() {
        let engine = RhaiEngine::default();
        let request = MockRequest::grpc(BTreeMap::new(), Value::Null);
        assert_eq!(request.protocol, Protocol::Grpc);

        let err = engine
            .evaluate_blocking(&grpc_mock("#{ status: 200 }"), &request, Span::none())
            .unwrap_err();
        assert!(matches!(err, ScriptError::InvalidExport { .. }));
    }
}
