//! Configuration validation

use crate::Config;
use mockwire_core::{Error, Result};
use std::path::Path;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_log(config)?;

    if !config.http.enabled && !config.grpc.enabled {
        return Err(Error::Config(
            "at least one of http or grpc must be enabled".to_string(),
        ));
    }

    validate_http(config)?;
    validate_grpc(config)?;
    validate_scripting(config)?;

    if config.http.enabled && config.grpc.enabled && config.http.listen == config.grpc.listen {
        return Err(Error::Config(format!(
            "http and grpc cannot both listen on {}",
            config.http.listen
        )));
    }

    Ok(())
}

fn validate_log(config: &Config) -> Result<()> {
    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level: {} (must be one of {})",
            config.log.level,
            LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_http(config: &Config) -> Result<()> {
    let http = &config.http;
    if !http.enabled {
        return Ok(());
    }

    require_dir("http.mocks_dir", &http.mocks_dir)?;

    if http.wildcard_token.is_empty() {
        return Err(Error::Config("http.wildcard_token cannot be empty".to_string()));
    }

    if http.wildcard_token.contains('/') {
        return Err(Error::Config(
            "http.wildcard_token cannot contain '/'".to_string(),
        ));
    }

    if http.max_body_size == 0 {
        return Err(Error::Config("http.max_body_size must be > 0".to_string()));
    }

    Ok(())
}

fn validate_grpc(config: &Config) -> Result<()> {
    let grpc = &config.grpc;
    if !grpc.enabled {
        return Ok(());
    }

    require_dir("grpc.mocks_dir", &grpc.mocks_dir)?;

    for path in &grpc.import_paths {
        if !path.is_dir() {
            tracing::warn!(path = %path.display(), "Import path does not exist");
        }
    }

    Ok(())
}

fn validate_scripting(config: &Config) -> Result<()> {
    if config.scripting.timeout.is_zero() {
        return Err(Error::Config("scripting.timeout must be > 0".to_string()));
    }

    if config.scripting.timeout.as_secs() > 60 {
        tracing::warn!("scripting.timeout is very high (>1 minute)");
    }

    Ok(())
}

fn require_dir(field: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{field}: directory {} does not exist",
            path.display()
        )))
    }
}
