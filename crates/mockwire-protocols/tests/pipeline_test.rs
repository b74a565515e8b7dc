//! End-to-end request pipelines over a discovered mock tree

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use mockwire_core::Value;
use mockwire_protocols::grpc::reflection::{REFLECTION_V1ALPHA_PATH, REFLECTION_V1_PATH};
use mockwire_protocols::{GrpcDispatcher, HttpMockHandler};
use mockwire_registry::{MockRegistry, RegistryOptions};
use mockwire_router::Router;
use mockwire_schema::{decode_message, encode_message};
use mockwire_scripting::{RhaiEngine, ScriptEvaluator};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const USERS_PROTO: &str = r#"
syntax = "proto3";
package acme.users;

service UserService {
  rpc GetUser (GetUserRequest) returns (User);
  rpc Lookup (GetUserRequest) returns (User);
  rpc Unscripted (GetUserRequest) returns (User);
  rpc EchoHits (Counter) returns (Counter);
}

message Counter {
  uint64 hits = 1;
}

message GetUserRequest {
  int64 id = 1;
}

message User {
  int64 id = 1;
  string name = 2;
  repeated string roles = 3;
}
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

struct Fixture {
    _http: TempDir,
    _grpc: TempDir,
    registry: MockRegistry,
    evaluator: Arc<dyn ScriptEvaluator>,
}

fn fixture() -> Fixture {
    let http = TempDir::new().unwrap();
    write(
        http.path(),
        "users/__id/GET.rhai",
        r#"
        #{
            status: 200,
            headers: #{ "x-mock": "users" },
            body: #{ id: request.params.id, q: request.params.q, agent: request.headers["user-agent"] }
        }
        "#,
    );
    write(
        http.path(),
        "users/POST.rhai",
        "#{ status: 201, body: #{ created: request.body.name } }",
    );
    write(http.path(), "broken/GET.rhai", "let x = ; #{}");
    write(http.path(), "GET.rhai", "#{ body: () }");

    let grpc = TempDir::new().unwrap();
    write(grpc.path(), "acme/users/users.proto", USERS_PROTO);
    write(
        grpc.path(),
        "acme/users/UserService/GetUser.rhai",
        r#"
        console.log("serving", request.body.id);
        #{ body: #{ id: request.body.id, name: "user-" + request.body.id, roles: ["admin"] } }
        "#,
    );
    write(
        grpc.path(),
        "acme/users/UserService/Lookup.rhai",
        r#"#{ error: #{ code: 5, message: "missing" } }"#,
    );
    write(
        grpc.path(),
        "acme/users/UserService/EchoHits.rhai",
        "#{ body: #{ hits: request.body.hits } }",
    );

    let registry = MockRegistry::load(&RegistryOptions {
        http_root: Some(http.path().to_path_buf()),
        grpc_root: Some(grpc.path().to_path_buf()),
        ..RegistryOptions::default()
    })
    .unwrap();

    Fixture {
        _http: http,
        _grpc: grpc,
        registry,
        evaluator: Arc::new(RhaiEngine::default()),
    }
}

fn http_handler(fixture: &Fixture) -> HttpMockHandler {
    let router = Router::from_mocks(fixture.registry.http_mocks()).unwrap();
    HttpMockHandler::new(Arc::new(router), Arc::clone(&fixture.evaluator))
}

fn http_request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("user-agent", "pipeline-test")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

async fn http_body(response: http::Response<Full<Bytes>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 5);
    buf.put_u8(0);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

fn grpc_request(path: &str, payload: &[u8]) -> Request<tonic::body::BoxBody> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/grpc")
        .header("te", "trailers")
        .header("x-request-id", "grpc-req-1")
        .body(tonic::body::boxed(Full::new(frame(payload))))
        .unwrap()
}

struct GrpcReply {
    headers: HeaderMap,
    status: Option<String>,
    message: Option<String>,
    body: Bytes,
}

async fn grpc_reply(response: http::Response<tonic::body::BoxBody>) -> GrpcReply {
    let (parts, body) = response.into_parts();
    let collected = body.collect().await.unwrap();
    let trailers = collected.trailers().cloned().unwrap_or_default();

    let lookup = |name: &str| {
        parts
            .headers
            .get(name)
            .or_else(|| trailers.get(name))
            .map(|v| v.to_str().unwrap().to_string())
    };

    GrpcReply {
        status: lookup("grpc-status"),
        message: lookup("grpc-message"),
        headers: parts.headers.clone(),
        body: collected.to_bytes(),
    }
}

#[tokio::test]
async fn test_http_path_and_query_params() {
    let fixture = fixture();
    let handler = http_handler(&fixture);

    let response = handler
        .handle(http_request(Method::GET, "/users/42?q=search&id=ignored", ""))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-mock").unwrap(), "users");
    assert_eq!(response.headers().get("content-type").unwrap(), "application/json");
    assert!(response.headers().contains_key("x-request-id"));

    let body = Value::from_json_slice(&http_body(response).await).unwrap();
    assert_eq!(body.get("id"), Some(&Value::from("42")));
    assert_eq!(body.get("q"), Some(&Value::from("search")));
    assert_eq!(body.get("agent"), Some(&Value::from("pipeline-test")));
}

#[tokio::test]
async fn test_http_json_body_and_status() {
    let fixture = fixture();
    let handler = http_handler(&fixture);

    let response = handler
        .handle(http_request(Method::POST, "/users", r#"{"name":"ada"}"#))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(&http_body(response).await[..], br#"{"created":"ada"}"#);
}

#[tokio::test]
async fn test_http_null_body_is_empty() {
    let fixture = fixture();
    let handler = http_handler(&fixture);

    let response = handler.handle(http_request(Method::GET, "/", "")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(http_body(response).await.is_empty());
}

#[tokio::test]
async fn test_http_failures() {
    let fixture = fixture();
    let handler = http_handler(&fixture);

    let response = handler.handle(http_request(Method::GET, "/nowhere", "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(http_body(response).await.starts_with(b"Error: "));

    let response = handler.handle(http_request(Method::POST, "/users", "{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = handler.handle(http_request(Method::GET, "/broken", "")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(http_body(response).await.starts_with(b"Error: "));
}

#[tokio::test]
async fn test_http_body_limit() {
    let fixture = fixture();
    let handler = http_handler(&fixture).with_max_body_size(8);

    let response = handler
        .handle(http_request(Method::POST, "/users", r#"{"name":"a very long name"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_request_id_is_echoed() {
    let fixture = fixture();
    let handler = http_handler(&fixture);

    let mut request = http_request(Method::GET, "/users/1", "");
    request
        .headers_mut()
        .insert("x-request-id", "req-abc".parse().unwrap());

    let response = handler.handle(request).await;
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc");
}

#[tokio::test]
async fn test_grpc_unary_call() {
    let fixture = fixture();
    let dispatcher = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));
    let schema = fixture.registry.schema().unwrap();

    let input = schema.pool().get_message_by_name("acme.users.GetUserRequest").unwrap();
    let output = schema.pool().get_message_by_name("acme.users.User").unwrap();

    let payload = encode_message(
        &input,
        &[("id".to_string(), Value::Int(7))].into_iter().collect(),
    )
    .unwrap();

    let response = dispatcher
        .handle(grpc_request("/acme.users.UserService/GetUser", &payload))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let reply = grpc_reply(response).await;
    assert_eq!(reply.status.as_deref(), Some("0"));
    assert_eq!(reply.headers.get("x-request-id").unwrap(), "grpc-req-1");

    assert_eq!(reply.body[0], 0);
    let len = u32::from_be_bytes(reply.body[1..5].try_into().unwrap()) as usize;
    let user = decode_message(&output, &reply.body[5..5 + len]).unwrap();

    assert_eq!(user.get("id"), Some(&Value::Int(7)));
    assert_eq!(user.get("name"), Some(&Value::from("user-7")));
    assert_eq!(user.get("roles"), Some(&Value::List(vec![Value::from("admin")])));
}

#[tokio::test]
async fn test_grpc_uint64_survives_the_script() {
    let fixture = fixture();
    let dispatcher = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));
    let counter = fixture
        .registry
        .schema()
        .unwrap()
        .pool()
        .get_message_by_name("acme.users.Counter")
        .unwrap();

    for hits in [7, i64::MAX as u64 + 1, u64::MAX] {
        let payload = encode_message(
            &counter,
            &[("hits".to_string(), Value::Uint(hits))].into_iter().collect(),
        )
        .unwrap();

        let response = dispatcher
            .handle(grpc_request("/acme.users.UserService/EchoHits", &payload))
            .await;
        let reply = grpc_reply(response).await;
        assert_eq!(reply.status.as_deref(), Some("0"), "{hits}");

        let len = u32::from_be_bytes(reply.body[1..5].try_into().unwrap()) as usize;
        let echoed = decode_message(&counter, &reply.body[5..5 + len]).unwrap();
        assert_eq!(echoed.get("hits"), Some(&Value::Uint(hits)));
    }
}

#[tokio::test]
async fn test_grpc_explicit_error() {
    let fixture = fixture();
    let dispatcher = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));

    let response = dispatcher
        .handle(grpc_request("/acme.users.UserService/Lookup", b""))
        .await;

    let reply = grpc_reply(response).await;
    assert_eq!(reply.status.as_deref(), Some("5"));
    assert_eq!(reply.message.as_deref(), Some("missing"));
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_grpc_unbound_method_is_unimplemented() {
    let fixture = fixture();
    let dispatcher = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));

    for path in [
        "/acme.users.UserService/Unscripted",
        "/acme.users.UserService/Nope",
    ] {
        let reply = grpc_reply(dispatcher.handle(grpc_request(path, b"")).await).await;
        assert_eq!(reply.status.as_deref(), Some("12"), "{path}");
    }
}

#[tokio::test]
async fn test_grpc_malformed_payload() {
    let fixture = fixture();
    let dispatcher = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));

    let response = dispatcher
        .handle(grpc_request("/acme.users.UserService/GetUser", &[0x08, 0xff]))
        .await;

    let reply = grpc_reply(response).await;
    assert_eq!(reply.status.as_deref(), Some("3"));
}

#[tokio::test]
async fn test_grpc_reflection_registered() {
    let fixture = fixture();
    let schema = fixture.registry.schema().unwrap();

    let plain = GrpcDispatcher::new(fixture.registry.grpc_mocks(), Arc::clone(&fixture.evaluator));
    assert_eq!(
        plain.methods().paths(),
        vec![
            "/acme.users.UserService/EchoHits",
            "/acme.users.UserService/GetUser",
            "/acme.users.UserService/Lookup",
        ]
    );

    let dispatcher = plain.with_reflection(schema).unwrap();
    assert!(dispatcher.methods().get(REFLECTION_V1_PATH).is_some());
    assert!(dispatcher.methods().get(REFLECTION_V1ALPHA_PATH).is_some());
    assert_eq!(dispatcher.methods().len(), 5);
}
