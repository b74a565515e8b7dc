//! Serving real connections over loopback

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use mockwire_config::Config;
use mockwire_runtime::MockServer;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const ECHO_PROTO: &str = r#"
syntax = "proto3";
package acme;

service Echo {
  rpc Say (SayRequest) returns (Reply);
}

message SayRequest { string text = 1; }
message Reply { string text = 1; }
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

struct Running {
    _dirs: (TempDir, TempDir),
    server: Arc<MockServer>,
    http: SocketAddr,
    grpc: SocketAddr,
    task: tokio::task::JoinHandle<mockwire_core::Result<()>>,
}

async fn start() -> Running {
    let http_dir = TempDir::new().unwrap();
    let grpc_dir = TempDir::new().unwrap();

    write(
        http_dir.path(),
        "hello/__name/GET.rhai",
        r#"#{ headers: #{ "x-mock": "hello" }, body: #{ greeting: "hello " + request.params.name } }"#,
    );
    write(grpc_dir.path(), "acme/echo.proto", ECHO_PROTO);
    write(
        grpc_dir.path(),
        "acme/Echo/Say.rhai",
        r#"#{ body: #{ text: "echo: " + request.body.text } }"#,
    );

    let mut config = Config::default();
    config.http.mocks_dir = http_dir.path().to_path_buf();
    config.grpc.mocks_dir = grpc_dir.path().to_path_buf();
    config.shutdown_timeout = Duration::from_secs(1);

    let server = Arc::new(MockServer::build(config).unwrap());

    let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let grpc_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http = http_listener.local_addr().unwrap();
    let grpc = grpc_listener.local_addr().unwrap();

    let task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(Some(http_listener), Some(grpc_listener)).await })
    };

    Running {
        _dirs: (http_dir, grpc_dir),
        server,
        http,
        grpc,
        task,
    }
}

fn grpc_frame(payload: &[u8]) -> Bytes {
    let mut frame = vec![0u8];
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Bytes::from(frame)
}

#[tokio::test]
async fn test_http_over_tcp() {
    let running = start().await;
    let client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();

    let response = client
        .request(
            Request::get(format!("http://{}/hello/world", running.http))
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-mock").unwrap(), "hello");
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], br#"{"greeting":"hello world"}"#);

    running.server.shutdown_signal().trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_grpc_over_h2() {
    let running = start().await;
    let client = Client::builder(TokioExecutor::new())
        .http2_only(true)
        .build_http::<Full<Bytes>>();

    // SayRequest { text: "hi" }
    let payload = [0x0a, 0x02, b'h', b'i'];
    let response = client
        .request(
            Request::post(format!("http://{}/acme.Echo/Say", running.grpc))
                .header("content-type", "application/grpc")
                .header("te", "trailers")
                .body(Full::new(grpc_frame(&payload)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let collected = response.into_body().collect().await.unwrap();
    let trailers = collected.trailers().cloned().unwrap();
    assert_eq!(trailers.get("grpc-status").unwrap(), "0");

    let body = collected.to_bytes();
    let text = b"echo: hi";
    let mut expected = vec![0x0a, text.len() as u8];
    expected.extend_from_slice(text);
    assert_eq!(&body[..], &grpc_frame(&expected)[..]);

    running.server.shutdown_signal().trigger();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_listeners() {
    let running = start().await;

    running.server.shutdown_signal().trigger();
    tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(running.server.in_flight(), 0);
}

#[test]
fn test_demo_tree_builds() {
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");

    let mut config = mockwire_config::load_from_file(demos.join("config.yaml")).unwrap();
    config.http.mocks_dir = demos.join("mocks/http");
    config.grpc.mocks_dir = demos.join("mocks/grpc");
    config.grpc.import_paths = vec![demos.join("include")];

    let server = MockServer::build(config).unwrap();
    let registry = server.registry();

    let mut routes: Vec<String> = registry.http_mocks().iter().map(|m| m.name()).collect();
    routes.sort();
    assert_eq!(
        routes,
        vec!["GET /health", "GET /users", "GET /users/:id", "POST /users"]
    );

    let mut methods: Vec<String> = registry.grpc_mocks().iter().map(|m| m.path()).collect();
    methods.sort();
    assert_eq!(
        methods,
        vec![
            "/acme.users.UserService/GetUser",
            "/acme.users.UserService/ListUsers",
        ]
    );

    let engine = mockwire_scripting::RhaiEngine::default();
    let scripts = registry
        .http_mocks()
        .iter()
        .map(|m| m.as_ref())
        .chain(registry.grpc_mocks().iter().map(|m| m.definition.as_ref()));
    for mock in scripts {
        assert!(
            engine.check(&mock.script).is_ok(),
            "{} does not compile",
            mock.source_path.display()
        );
    }
}
