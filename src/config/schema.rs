//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Public and admin listeners.
    pub listener: ListenerConfig,

    /// Where routes and backends come from.
    pub store: StoreConfig,

    /// Upstream call settings.
    pub backend: BackendConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address for public traffic (e.g., "0.0.0.0:8080").
    pub public_address: String,

    /// Address for the admin API.
    pub admin_address: String,

    /// Idle timeout while reading a request body.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Idle timeout while writing a response body.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            public_address: "0.0.0.0:8080".to_string(),
            admin_address: "0.0.0.0:8081".to_string(),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
        }
    }
}

/// Route store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the routes document (TOML, or JSON if it ends in `.json`).
    pub path: PathBuf,

    /// How often the store is polled for changes.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Also reload as soon as the document changes on disk.
    pub watch: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("routes.toml"),
            poll_interval: Duration::from_secs(2),
            watch: false,
        }
    }
}

/// Upstream (backend) call configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Bound on establishing the TCP connection.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Bound on waiting for response headers.
    #[serde(with = "humantime_serde")]
    pub header_timeout: Duration,

    /// Accept any upstream TLS certificate. Testing only.
    pub tls_skip_verify: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            header_timeout: Duration::from_secs(20),
            tls_skip_verify: false,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required on admin routes. No auth when unset.
    pub api_key: Option<String>,

    /// Longest a `/reload` call waits for the rebuild to finish.
    #[serde(with = "humantime_serde")]
    pub reload_wait: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            reload_wait: Duration::from_secs(30),
        }
    }
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Console log format.
    pub log_format: LogFormat,

    /// Destination of the JSON error log: `STDERR`, `STDOUT` or a file path.
    pub error_log: String,

    /// Prometheus endpoint bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            error_log: "STDERR".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RouterConfig::default();
        assert_eq!(config.listener.public_address, "0.0.0.0:8080");
        assert_eq!(config.listener.admin_address, "0.0.0.0:8081");
        assert_eq!(config.store.poll_interval, Duration::from_secs(2));
        assert_eq!(config.backend.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.backend.header_timeout, Duration::from_secs(20));
        assert!(!config.backend.tls_skip_verify);
        assert_eq!(config.observability.error_log, "STDERR");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: RouterConfig = toml::from_str(
            r#"
            [backend]
            header_timeout = "15s"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.header_timeout, Duration::from_secs(15));
        assert_eq!(config.backend.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener, ListenerConfig::default());
    }
}
