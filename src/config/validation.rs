//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listen addresses and timeout values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Warnings are returned, not logged; logging is not up yet when config loads

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::schema::RouterConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("store.path must not be empty")]
    EmptyStorePath,
}

/// Accepted but risky settings, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigWarning {
    #[error("backend.tls_skip_verify is set; backend certificates are not verified")]
    TlsVerificationDisabled,
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.public_address", &config.listener.public_address);
    check_address(&mut errors, "listener.admin_address", &config.listener.admin_address);
    if let Some(addr) = &config.observability.metrics_address {
        check_address(&mut errors, "observability.metrics_address", addr);
    }

    let durations: [(&'static str, Duration); 6] = [
        ("listener.read_timeout", config.listener.read_timeout),
        ("listener.write_timeout", config.listener.write_timeout),
        ("store.poll_interval", config.store.poll_interval),
        ("backend.connect_timeout", config.backend.connect_timeout),
        ("backend.header_timeout", config.backend.header_timeout),
        ("admin.reload_wait", config.admin.reload_wait),
    ];
    for (field, value) in durations {
        if value.is_zero() {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if config.store.path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyStorePath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn config_warnings(config: &RouterConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.backend.tls_skip_verify {
        warnings.push(ConfigWarning::TlsVerificationDisabled);
    }

    warnings
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
