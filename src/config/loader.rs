//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error(
        "Validation failed: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    Validation(Vec<ValidationError>),
}

/// Load configuration: defaults, then the file (if any), then `ROUTER_*`
/// environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<RouterConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => RouterConfig::default(),
    };

    apply_env_overrides(&mut config, |key| {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML configuration file without validating it.
pub fn parse_file(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RouterConfig = toml::from_str(&content)?;
    normalize_addresses(&mut config);
    Ok(config)
}

/// Apply the router's environment variables on top of `config`.
///
/// `lookup` returns the value of a variable, or `None` when it is unset or
/// empty.
pub fn apply_env_overrides<F>(config: &mut RouterConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("ROUTER_PUBADDR") {
        config.listener.public_address = addr;
    }
    if let Some(addr) = lookup("ROUTER_APIADDR") {
        config.listener.admin_address = addr;
    }
    if let Some(path) = lookup("ROUTER_STORE_PATH") {
        config.store.path = PathBuf::from(path);
    }
    if let Some(dest) = lookup("ROUTER_ERROR_LOG") {
        config.observability.error_log = dest;
    }
    if lookup("ROUTER_TLS_SKIP_VERIFY").is_some() {
        config.backend.tls_skip_verify = true;
    }
    if let Some(key) = lookup("ROUTER_ADMIN_API_KEY") {
        config.admin.api_key = Some(key);
    }
    if let Some(addr) = lookup("ROUTER_METRICS_ADDR") {
        config.observability.metrics_address = Some(addr);
    }
    if lookup("DEBUG").is_some() {
        config.observability.log_level = "debug".to_string();
    }

    override_duration(&lookup, "ROUTER_POLL_INTERVAL", &mut config.store.poll_interval)?;
    override_duration(
        &lookup,
        "ROUTER_BACKEND_CONNECT_TIMEOUT",
        &mut config.backend.connect_timeout,
    )?;
    override_duration(
        &lookup,
        "ROUTER_BACKEND_HEADER_TIMEOUT",
        &mut config.backend.header_timeout,
    )?;
    override_duration(
        &lookup,
        "ROUTER_FRONTEND_READ_TIMEOUT",
        &mut config.listener.read_timeout,
    )?;
    override_duration(
        &lookup,
        "ROUTER_FRONTEND_WRITE_TIMEOUT",
        &mut config.listener.write_timeout,
    )?;

    normalize_addresses(config);
    Ok(())
}

fn override_duration<F>(lookup: &F, key: &'static str, target: &mut Duration) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = humantime::parse_duration(&raw).map_err(|e| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Accept Go-style `:8080` listen addresses.
pub fn normalize_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

fn normalize_addresses(config: &mut RouterConfig) {
    config.listener.public_address = normalize_address(&config.listener.public_address);
    config.listener.admin_address = normalize_address(&config.listener.admin_address);
    if let Some(addr) = config.observability.metrics_address.as_mut() {
        *addr = normalize_address(addr);
    }
}
