//! Mock discovery from the directory convention
//!
//! HTTP: `<root>/<route>/<VERB>.rhai`, where a directory named `<token><name>`
//! becomes the path parameter `:name`. A script directly under the root
//! serves `/`.
//!
//! gRPC: `<root>/<package path>/<Service>/<Method>.rhai`. Package path
//! segments are joined with `.`. `.proto` files anywhere under the root are
//! collected for the schema compiler.
//!
//! Both walks are pure functions of the file tree. Entries are visited in
//! file name order, so when two files map to the same identifier the one
//! visited last wins.

use indexmap::IndexMap;
use mockwire_core::{Error, GrpcMethodId, HttpRouteId, MockDefinition, MockId, Result};
use mockwire_schema::PROTO_EXTENSION;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extension of mock scripts
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Default prefix marking a path parameter directory
pub const DEFAULT_WILDCARD_TOKEN: &str = "__";

/// HTTP verbs a script file may be named after
pub const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Result of walking a gRPC mock root
#[derive(Debug, Clone, Default)]
pub struct GrpcDiscovery {
    /// One definition per method identifier
    pub mocks: Vec<MockDefinition>,
    /// Schema files, relative to the root
    pub proto_files: Vec<PathBuf>,
}

/// Discover HTTP mocks under `root`
pub fn discover_http(root: &Path, wildcard_token: &str) -> Result<Vec<MockDefinition>> {
    let mut mocks: IndexMap<HttpRouteId, MockDefinition> = IndexMap::new();

    for (path, relative) in walk(root)? {
        if !has_extension(&path, SCRIPT_EXTENSION) {
            continue;
        }

        let Some(id) = http_route_id(&relative, wildcard_token) else {
            warn!(path = %path.display(), "Skipping script: not a valid HTTP mock path");
            continue;
        };

        let script = read_script(&path)?;
        debug!(route = %id, path = %path.display(), "Discovered HTTP mock");

        if let Some(previous) = mocks.insert(
            id.clone(),
            MockDefinition::new(MockId::Http(id.clone()), script, path.clone()),
        ) {
            warn!(
                route = %id,
                replaced = %previous.source_path.display(),
                by = %path.display(),
                "Duplicate HTTP mock, last one wins"
            );
        }
    }

    Ok(mocks.into_values().collect())
}

/// Discover gRPC mocks and schema files under `root`
pub fn discover_grpc(root: &Path) -> Result<GrpcDiscovery> {
    let mut mocks: IndexMap<GrpcMethodId, MockDefinition> = IndexMap::new();
    let mut proto_files = Vec::new();

    for (path, relative) in walk(root)? {
        if has_extension(&path, PROTO_EXTENSION) {
            debug!(path = %relative.display(), "Discovered schema file");
            proto_files.push(relative);
            continue;
        }
        if !has_extension(&path, SCRIPT_EXTENSION) {
            continue;
        }

        let Some(id) = grpc_method_id(&relative) else {
            warn!(path = %path.display(), "Skipping script: not inside a service directory");
            continue;
        };

        let script = read_script(&path)?;
        debug!(method = %id, path = %path.display(), "Discovered gRPC mock");

        if let Some(previous) = mocks.insert(
            id.clone(),
            MockDefinition::new(MockId::Grpc(id.clone()), script, path.clone()),
        ) {
            warn!(
                method = %id,
                replaced = %previous.source_path.display(),
                by = %path.display(),
                "Duplicate gRPC mock, last one wins"
            );
        }
    }

    Ok(GrpcDiscovery {
        mocks: mocks.into_values().collect(),
        proto_files,
    })
}

/// Every file under `root` as `(full path, path relative to root)`
fn walk(root: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Discovery(format!("{}: {e}", root.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let relative = path
            .strip_prefix(root)
            .map_err(|e| Error::Discovery(format!("{}: {e}", path.display())))?
            .to_path_buf();
        files.push((path, relative));
    }

    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::Discovery(format!("{}: {e}", path.display())))
}

/// Directory names between the root and the file
fn dir_segments(relative: &Path) -> Option<Vec<String>> {
    relative
        .parent()
        .map(|dir| {
            dir.components()
                .map(|c| match c {
                    Component::Normal(s) => s.to_str().map(str::to_string),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
        })
        .unwrap_or(Some(Vec::new()))
}

fn file_stem(relative: &Path) -> Option<&str> {
    relative.file_stem().and_then(|s| s.to_str()).filter(|s| !s.is_empty())
}

/// `users/__id/GET.rhai` -> `GET /users/:id`
pub fn http_route_id(relative: &Path, wildcard_token: &str) -> Option<HttpRouteId> {
    let verb = file_stem(relative)?.to_ascii_uppercase();
    if !HTTP_METHODS.contains(&verb.as_str()) {
        return None;
    }

    let mut path = String::new();
    for segment in dir_segments(relative)? {
        path.push('/');
        match segment.strip_prefix(wildcard_token) {
            Some("") => return None,
            Some(name) if !wildcard_token.is_empty() => {
                path.push(':');
                path.push_str(name);
            }
            _ => path.push_str(&segment),
        }
    }
    if path.is_empty() {
        path.push('/');
    }

    Some(HttpRouteId::new(verb, path))
}

/// `acme/billing/Invoices/Create.rhai` -> `acme.billing.Invoices/Create`
pub fn grpc_method_id(relative: &Path) -> Option<GrpcMethodId> {
    let method = file_stem(relative)?;
    let mut dirs = dir_segments(relative)?;
    let service = dirs.pop()?;

    Some(GrpcMethodId::new(dirs.join("."), service, method))
}
