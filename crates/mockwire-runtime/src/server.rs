//! Mock server lifecycle

use crate::listener::{serve_grpc, serve_http};
use crate::shutdown::{InFlight, ShutdownSignal};
use mockwire_config::Config;
use mockwire_core::{Error, Result};
use mockwire_protocols::{GrpcDispatcher, HttpMockHandler};
use mockwire_registry::{MockRegistry, RegistryOptions};
use mockwire_router::Router;
use mockwire_scripting::{RhaiEngine, ScriptEvaluator, ScriptLimits};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Registry options for the enabled servers
pub fn registry_options(config: &Config) -> RegistryOptions {
    RegistryOptions {
        http_root: config.http.enabled.then(|| config.http.mocks_dir.clone()),
        wildcard_token: config.http.wildcard_token.clone(),
        grpc_root: config.grpc.enabled.then(|| config.grpc.mocks_dir.clone()),
        import_paths: config.grpc.import_paths.clone(),
    }
}

/// Script limits from the scripting section
pub fn script_limits(config: &Config) -> ScriptLimits {
    ScriptLimits {
        timeout: config.scripting.timeout,
        max_operations: config.scripting.max_operations,
        ..ScriptLimits::default()
    }
}

/// HTTP and gRPC mock server
///
/// Everything served is built once in [`MockServer::build`] and shared
/// read-only by every connection.
#[derive(Debug)]
pub struct MockServer {
    config: Config,
    registry: MockRegistry,
    http: Option<HttpMockHandler>,
    grpc: Option<GrpcDispatcher>,
    shutdown: ShutdownSignal,
    in_flight: InFlight,
}

impl MockServer {
    /// Discover mocks, compile schemas and build the handlers
    pub fn build(config: Config) -> Result<Self> {
        let registry = MockRegistry::load(&registry_options(&config))?;
        let evaluator: Arc<dyn ScriptEvaluator> = Arc::new(RhaiEngine::new(script_limits(&config)));

        let http = if config.http.enabled {
            let router = Router::from_mocks(registry.http_mocks())?;
            Some(
                HttpMockHandler::new(Arc::new(router), Arc::clone(&evaluator))
                    .with_max_body_size(config.http.max_body_size),
            )
        } else {
            None
        };

        let grpc = if config.grpc.enabled {
            let dispatcher = GrpcDispatcher::new(registry.grpc_mocks(), Arc::clone(&evaluator));
            match registry.schema() {
                Some(schema) if config.grpc.reflection => Some(dispatcher.with_reflection(schema)?),
                _ => Some(dispatcher),
            }
        } else {
            None
        };

        if registry.is_empty() {
            tracing::warn!("No mocks discovered");
        }

        Ok(Self {
            config,
            registry,
            http,
            grpc,
            shutdown: ShutdownSignal::new(),
            in_flight: InFlight::new(),
        })
    }

    /// Loaded mocks
    pub fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Requests currently being served
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Bind the configured addresses and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let http = match &self.http {
            Some(_) => Some(bind(self.config.http.listen).await?),
            None => None,
        };
        let grpc = match &self.grpc {
            Some(_) => Some(bind(self.config.grpc.listen).await?),
            None => None,
        };

        self.serve(http, grpc).await
    }

    /// Serve on already bound listeners until shutdown
    ///
    /// A listener is ignored when its protocol is disabled.
    pub async fn serve(
        &self,
        http_listener: Option<TcpListener>,
        grpc_listener: Option<TcpListener>,
    ) -> Result<()> {
        let mut tasks = Vec::new();

        if let (Some(handler), Some(listener)) = (&self.http, http_listener) {
            tracing::info!(
                listen = %local_addr(&listener)?,
                routes = handler.router().total_route_count(),
                "HTTP mock server starting"
            );
            tasks.push(tokio::spawn(serve_http(
                listener,
                handler.clone(),
                self.in_flight.clone(),
                self.shutdown.clone(),
            )));
        }

        if let (Some(dispatcher), Some(listener)) = (&self.grpc, grpc_listener) {
            tracing::info!(
                listen = %local_addr(&listener)?,
                methods = dispatcher.methods().len(),
                "gRPC mock server starting"
            );
            tasks.push(tokio::spawn(serve_grpc(
                listener,
                dispatcher.clone(),
                self.in_flight.clone(),
                self.shutdown.clone(),
            )));
        }

        if tasks.is_empty() {
            return Err(Error::Runtime("no listener to serve".to_string()));
        }

        for task in tasks {
            task.await
                .map_err(|e| Error::Runtime(format!("listener task failed: {}", e)))?;
        }

        tracing::info!("Server shutting down gracefully");
        let start = std::time::Instant::now();
        self.in_flight.wait_idle(self.config.shutdown_timeout).await;

        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis() as u64,
            "Server stopped"
        );

        Ok(())
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Runtime(format!("Failed to bind to {}: {}", addr, e)))
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr> {
    Ok(listener.local_addr()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(http: &TempDir, grpc: &TempDir) -> Config {
        let mut config = Config::default();
        config.http.mocks_dir = http.path().to_path_buf();
        config.grpc.mocks_dir = grpc.path().to_path_buf();
        config
    }

    #[test]
    fn test_registry_options_follow_enabled_flags() {
        let (http, grpc) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let mut config = config(&http, &grpc);
        config.grpc.enabled = false;

        let options = registry_options(&config);
        assert_eq!(options.http_root.as_deref(), Some(http.path()));
        assert!(options.grpc_root.is_none());
        assert_eq!(options.wildcard_token, "__");
    }

    #[test]
    fn test_script_limits_from_config() {
        let (http, grpc) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let mut config = config(&http, &grpc);
        config.scripting.max_operations = 42;

        let limits = script_limits(&config);
        assert_eq!(limits.max_operations, 42);
        assert_eq!(limits.timeout, config.scripting.timeout);
    }

    #[test]
    fn test_build() {
        let (http, grpc) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::create_dir_all(http.path().join("ping")).unwrap();
        fs::write(http.path().join("ping/GET.rhai"), "#{ body: \"pong\" }").unwrap();

        let server = MockServer::build(config(&http, &grpc)).unwrap();
        assert_eq!(server.registry().http_mocks().len(), 1);
        assert_eq!(server.in_flight(), 0);
    }

    #[test]
    fn test_build_rejects_route_conflict() {
        let (http, grpc) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        fs::create_dir_all(http.path().join("users/__id")).unwrap();
        fs::create_dir_all(http.path().join("users/__name")).unwrap();
        fs::write(http.path().join("users/__id/GET.rhai"), "#{}").unwrap();
        fs::write(http.path().join("users/__name/GET.rhai"), "#{}").unwrap();

        assert!(matches!(
            MockServer::build(config(&http, &grpc)),
            Err(Error::Discovery(_))
        ));
    }
}
