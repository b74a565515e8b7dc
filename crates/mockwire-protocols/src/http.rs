//! HTTP mock handling
//!
//! Inbound requests are matched against the [`Router`], normalized into a
//! [`MockRequest`], handed to the script evaluator and the exported
//! [`MockResponse`] is written back as JSON.

use crate::request_id::{request_id, set_request_id};
use crate::response::{Body, ResponseBuilder};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use mockwire_core::{Error, MockRequest, MockResponse, Result, Value};
use mockwire_router::Router;
use mockwire_scripting::ScriptEvaluator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Default cap on buffered request bodies (4 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Build the uniform request for an HTTP call
///
/// Header names are lower-cased and the first value wins. Query parameters
/// are added to `params` but never replace a path parameter of the same
/// name. An empty body is [`Value::Null`]; anything else must be JSON.
pub fn normalize_request(
    headers: &HeaderMap,
    query: Option<&str>,
    mut params: BTreeMap<String, String>,
    body: &[u8],
) -> Result<MockRequest> {
    let mut metadata = BTreeMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            metadata.insert(
                name.as_str().to_ascii_lowercase(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }

    if let Some(query) = query {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }

    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        Value::from_json_slice(body)
            .map_err(|e| Error::RequestDecode(format!("invalid JSON body: {}", e)))?
    };

    Ok(MockRequest::http(metadata, params, body))
}

/// Write a script export as an HTTP response
///
/// The status defaults to 200 and the body is serialized as JSON, with a
/// `Null` body producing an empty payload. Script headers are applied first;
/// `content-type` falls back to `application/json` when none was exported.
pub fn encode_response(response: MockResponse) -> Result<Response<Body>> {
    let code = response.status.unwrap_or(200);
    let status = StatusCode::from_u16(code)
        .map_err(|_| Error::ResponseEncode(format!("invalid HTTP status {}", code)))?;

    let mut builder = ResponseBuilder::new(status);
    let mut has_content_type = false;
    for (name, value) in &response.headers {
        has_content_type |= name.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str());
        builder = builder.try_header(name, value)?;
    }

    let payload = if response.body.is_null() {
        Vec::new()
    } else {
        response
            .body
            .to_json_vec()
            .map_err(|e| Error::ResponseEncode(format!("failed to serialize body: {}", e)))?
    };

    if has_content_type {
        builder.body(payload)
    } else {
        builder.json(payload)
    }
}

/// Plain-text response for a failed request
pub fn error_response(err: &Error) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::from(format!("Error: {}", err))));
    *response.status_mut() = err.to_status_code();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Serves HTTP mocks
///
/// Immutable once built; clones share the router and evaluator.
#[derive(Clone)]
pub struct HttpMockHandler {
    router: Arc<Router>,
    evaluator: Arc<dyn ScriptEvaluator>,
    max_body_size: usize,
}

impl fmt::Debug for HttpMockHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMockHandler")
            .field("routes", &self.router.total_route_count())
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

impl HttpMockHandler {
    /// Create a handler
    pub fn new(router: Arc<Router>, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self {
            router,
            evaluator,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Set the request body cap
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Routing table in use
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one request
    ///
    /// Never fails: every error is rendered as `Error: <message>` with the
    /// matching status code. The request id is echoed in `x-request-id`.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Body>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let request_id = request_id(req.headers());
        let span = info_span!(
            "http_request",
            protocol = "http",
            method = %req.method(),
            path = %req.uri().path(),
            route = tracing::field::Empty,
            request_id = %request_id,
        );

        let mut response = match self.serve(req).instrument(span.clone()).await {
            Ok(response) => response,
            Err(err) => {
                let _enter = span.enter();
                log_failure(&err);
                error_response(&err)
            }
        };

        set_request_id(response.headers_mut(), &request_id);

        span.in_scope(|| {
            debug!(
                status = response.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
        });

        response
    }

    async fn serve<B>(&self, req: Request<B>) -> Result<Response<Body>>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let matched = self.router.match_route(req.method(), req.uri().path())?;
        Span::current().record("route", matched.route.path.as_str());

        let (parts, body) = req.into_parts();
        let body = Limited::new(body, self.max_body_size)
            .collect()
            .await
            .map_err(|e| Error::RequestDecode(format!("failed to read body: {}", e)))?
            .to_bytes();

        let request = normalize_request(&parts.headers, parts.uri.query(), matched.params, &body)?;
        let response = self.evaluator.evaluate(&matched.route.mock, request).await?;

        encode_response(response)
    }
}

fn log_failure(err: &Error) {
    match err {
        Error::RouteNotFound(_) => info!(error = %err, "No mock for request"),
        Error::RequestDecode(_) => warn!(error = %err, "Failed to decode request"),
        _ => error!(error = %err, "Mock request failed"),
    }
}
