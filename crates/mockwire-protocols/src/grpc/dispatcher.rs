//! Path-keyed dispatch of unary gRPC calls

use super::codec::DynamicCodec;
use super::{encode_body, mock_status, normalize_request, reflection, status_from_error};
use crate::request_id::{request_id, set_request_id};
use futures::future::BoxFuture;
use http::{header, HeaderValue};
use mockwire_core::{Error, MockDefinition, Result};
use mockwire_registry::BoundMock;
use mockwire_schema::prost_reflect::{DynamicMessage, MessageDescriptor};
use mockwire_schema::CompiledSchema;
use mockwire_scripting::ScriptEvaluator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tonic::body::BoxBody;
use tonic::server::{Grpc, UnaryService};
use tonic::Status;
use tracing::{debug, error, info_span, warn, Instrument};

/// Handler for one request path
pub type MethodHandler =
    Arc<dyn Fn(http::Request<BoxBody>) -> BoxFuture<'static, http::Response<BoxBody>> + Send + Sync>;

/// Immutable map from `/package.Service/Method` to its handler
#[derive(Clone, Default)]
pub struct MethodTable {
    handlers: HashMap<String, MethodHandler>,
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("paths", &self.paths())
            .finish()
    }
}

impl MethodTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the path
    pub fn insert<F>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(http::Request<BoxBody>) -> BoxFuture<'static, http::Response<BoxBody>>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(path.into(), Arc::new(handler));
    }

    /// Look up a handler
    pub fn get(&self, path: &str) -> Option<&MethodHandler> {
        self.handlers.get(path)
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Number of registered paths
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Response for a path with no handler
///
/// gRPC reports failures in-band: HTTP 200 with `grpc-status` 12.
pub fn unimplemented_response(path: &str) -> http::Response<BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/grpc"),
    );
    headers.insert("grpc-status", HeaderValue::from(tonic::Code::Unimplemented as i32));
    if let Ok(message) = HeaderValue::from_str(&format!("no mock for method {}", path)) {
        headers.insert("grpc-message", message);
    }
    response
}

/// Serves the bound gRPC mocks
#[derive(Debug, Clone)]
pub struct GrpcDispatcher {
    methods: MethodTable,
}

impl GrpcDispatcher {
    /// Build a dispatcher for every bound mock
    pub fn new(mocks: &[BoundMock], evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        let mut methods = MethodTable::new();

        for bound in mocks {
            let service = MockMethod {
                definition: Arc::clone(&bound.definition),
                output: bound.method.output(),
                evaluator: Arc::clone(&evaluator),
            };
            let input = bound.method.input();

            methods.insert(bound.path(), move |req| {
                let service = service.clone();
                let codec = DynamicCodec::new(input.clone());
                Box::pin(async move {
                    let mut grpc = Grpc::new(codec);
                    grpc.unary(service, req).await
                })
            });
            debug!(path = %bound.path(), "gRPC method registered");
        }

        Self { methods }
    }

    /// Also answer server reflection (v1 and v1alpha) for `schema`
    pub fn with_reflection(mut self, schema: &CompiledSchema) -> Result<Self> {
        reflection::register(&mut self.methods, schema)?;
        Ok(self)
    }

    /// Registered paths and handlers
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Handle one call
    ///
    /// Unknown paths are answered with UNIMPLEMENTED; the request id is
    /// echoed in `x-request-id`.
    pub async fn handle(&self, req: http::Request<BoxBody>) -> http::Response<BoxBody> {
        let path = req.uri().path().to_string();
        let request_id = request_id(req.headers());
        let span = info_span!(
            "grpc_request",
            protocol = "grpc",
            method = %path,
            request_id = %request_id,
        );

        let mut response = match self.methods.get(&path) {
            Some(handler) => handler(req).instrument(span).await,
            None => {
                span.in_scope(|| warn!("No mock for gRPC method"));
                unimplemented_response(&path)
            }
        };

        set_request_id(response.headers_mut(), &request_id);
        response
    }
}

/// Unary service running one mock script
#[derive(Debug, Clone)]
struct MockMethod {
    definition: Arc<MockDefinition>,
    output: MessageDescriptor,
    evaluator: Arc<dyn ScriptEvaluator>,
}

impl MockMethod {
    async fn serve(
        self,
        request: tonic::Request<DynamicMessage>,
    ) -> std::result::Result<tonic::Response<DynamicMessage>, Status> {
        let mock_request =
            normalize_request(request.metadata(), request.get_ref()).map_err(fail)?;

        let response = self
            .evaluator
            .evaluate(&self.definition, mock_request)
            .await
            .map_err(fail)?;

        if let Some(err) = &response.error {
            debug!(code = err.code, message = %err.message, "Mock returned an error status");
            return Err(mock_status(err));
        }

        let message = encode_body(&self.output, &response.body).map_err(fail)?;
        Ok(tonic::Response::new(message))
    }
}

impl UnaryService<DynamicMessage> for MockMethod {
    type Response = DynamicMessage;
    type Future = BoxFuture<'static, std::result::Result<tonic::Response<DynamicMessage>, Status>>;

    fn call(&mut self, request: tonic::Request<DynamicMessage>) -> Self::Future {
        Box::pin(self.clone().serve(request))
    }
}

fn fail(err: Error) -> Status {
    if err.is_client_error() {
        warn!(error = %err, "Failed to decode gRPC request");
    } else {
        error!(error = %err, "gRPC mock failed");
    }
    status_from_error(&err)
}
