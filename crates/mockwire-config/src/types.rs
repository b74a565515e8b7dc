//! Configuration types

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Logging
    #[serde(default)]
    pub log: LogConfig,

    /// HTTP mock server
    #[serde(default)]
    pub http: HttpConfig,

    /// gRPC mock server
    #[serde(default)]
    pub grpc: GrpcConfig,

    /// Script evaluation limits
    #[serde(default)]
    pub scripting: ScriptingConfig,

    /// Graceful shutdown timeout (wait for in-flight requests)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            http: HttpConfig::default(),
            grpc: GrpcConfig::default(),
            scripting: ScriptingConfig::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpConfig {
    /// Serve HTTP mocks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,

    /// Root of the HTTP mock tree
    #[serde(default = "default_http_mocks_dir")]
    pub mocks_dir: PathBuf,

    /// Directory prefix marking a path parameter (`__id` -> `:id`)
    #[serde(default = "default_wildcard_token")]
    pub wildcard_token: String,

    /// Max request body size (bytes)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_http_listen(),
            mocks_dir: default_http_mocks_dir(),
            wildcard_token: default_wildcard_token(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrpcConfig {
    /// Serve gRPC mocks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_grpc_listen")]
    pub listen: SocketAddr,

    /// Root of the gRPC mock tree (scripts and `.proto` files)
    #[serde(default = "default_grpc_mocks_dir")]
    pub mocks_dir: PathBuf,

    /// Extra include paths for proto imports
    #[serde(default)]
    pub import_paths: Vec<PathBuf>,

    /// Answer gRPC server reflection
    #[serde(default = "default_true")]
    pub reflection: bool,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_grpc_listen(),
            mocks_dir: default_grpc_mocks_dir(),
            import_paths: Vec::new(),
            reflection: true,
        }
    }
}

/// Script evaluation limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptingConfig {
    /// Wall-clock deadline for one evaluation
    #[serde(default = "default_script_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Operation budget per evaluation (0 = unlimited)
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            timeout: default_script_timeout(),
            max_operations: default_max_operations(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_grpc_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn default_http_mocks_dir() -> PathBuf {
    PathBuf::from("./mocks/http")
}

fn default_grpc_mocks_dir() -> PathBuf {
    PathBuf::from("./mocks/grpc")
}

fn default_wildcard_token() -> String {
    "__".to_string()
}

fn default_max_body_size() -> usize {
    4 * 1024 * 1024 // 4 MB
}

fn default_script_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_operations() -> u64 {
    1_000_000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.http.enabled);
        assert!(config.grpc.enabled);
        assert_eq!(config.http.listen.port(), 8080);
        assert_eq!(config.grpc.listen.port(), 9090);
        assert_eq!(config.http.wildcard_token, "__");
        assert_eq!(config.scripting.timeout, Duration::from_secs(5));
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_humantime_durations() {
        let config: Config =
            serde_yaml::from_str("scripting:\n  timeout: 250ms\nshutdown_timeout: 1m\n").unwrap();
        assert_eq!(config.scripting.timeout, Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(60));
    }
}
