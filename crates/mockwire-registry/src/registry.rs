//! The served mock set

use crate::binder::{bind, BoundMock};
use crate::discovery::{discover_grpc, discover_http, DEFAULT_WILDCARD_TOKEN};
use mockwire_core::{MockDefinition, Result};
use mockwire_schema::{CompiledSchema, SchemaCompiler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Where to look for mocks
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// HTTP mock root (`None` disables HTTP)
    pub http_root: Option<PathBuf>,
    /// Prefix marking a path parameter directory
    pub wildcard_token: String,
    /// gRPC mock root (`None` disables gRPC)
    pub grpc_root: Option<PathBuf>,
    /// Extra schema import directories, searched after the gRPC root
    pub import_paths: Vec<PathBuf>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            http_root: None,
            wildcard_token: DEFAULT_WILDCARD_TOKEN.to_string(),
            grpc_root: None,
            import_paths: Vec::new(),
        }
    }
}

/// Every mock the process serves
///
/// Built once at startup, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    http: Vec<Arc<MockDefinition>>,
    grpc: Vec<BoundMock>,
    schema: Option<CompiledSchema>,
}

impl MockRegistry {
    /// Discover, compile and bind
    ///
    /// Fails on unreadable directories and schema errors.
    pub fn load(options: &RegistryOptions) -> Result<Self> {
        let mut registry = Self::default();

        if let Some(root) = &options.http_root {
            registry.http = discover_http(root, &options.wildcard_token)?
                .into_iter()
                .map(Arc::new)
                .collect();
            info!(root = %root.display(), routes = registry.http.len(), "HTTP mocks loaded");
        }

        if let Some(root) = &options.grpc_root {
            let discovery = discover_grpc(root)?;
            let scripts = discovery.mocks.len();

            let schema = SchemaCompiler::new(options.import_paths.iter().cloned())
                .compile(root, &discovery.proto_files)?;
            registry.grpc = bind(&schema, discovery.mocks);
            registry.schema = Some(schema);

            info!(
                root = %root.display(),
                schema_files = discovery.proto_files.len(),
                scripts,
                methods = registry.grpc.len(),
                "gRPC mocks loaded"
            );
        }

        Ok(registry)
    }

    /// HTTP mocks
    pub fn http_mocks(&self) -> &[Arc<MockDefinition>] {
        &self.http
    }

    /// Bound gRPC mocks
    pub fn grpc_mocks(&self) -> &[BoundMock] {
        &self.grpc
    }

    /// Compiled schema, when gRPC is enabled
    pub fn schema(&self) -> Option<&CompiledSchema> {
        self.schema.as_ref()
    }

    /// Whether nothing is served
    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.grpc.is_empty()
    }
}
