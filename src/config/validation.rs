//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required database fields are present
//! - Validate value ranges (timeouts > 0, limits > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: config → Result<(), Vec<ValidationError>>
//! - Pool settings are validated when the pool is built, not at load time,
//!   so a missing database never keeps the HTTP server from starting

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::db::PoolConfiguration;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn require(errors: &mut Vec<ValidationError>, field: &'static str, value: Option<&str>) {
    match value {
        Some(v) if !v.trim().is_empty() => {}
        _ => errors.push(ValidationError::new(field, "is required")),
    }
}

/// Validate database pool settings.
pub fn validate_pool(config: &PoolConfiguration) -> Result<(), Vec<ValidationError>> {
    let mut errors = config.env_errors.clone();

    require(&mut errors, "database.host", config.host.as_deref());
    require(&mut errors, "database.user", config.user.as_deref());
    require(&mut errors, "database.name", config.name.as_deref());

    if config.port == 0 {
        errors.push(ValidationError::new("database.port", "must be positive"));
    }
    if config.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be positive"));
    }
    if config.idle_timeout_ms == 0 {
        errors.push(ValidationError::new("database.idle_timeout_ms", "must be positive"));
    }
    if config.acquisition_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "database.acquisition_timeout_ms",
            "must be positive",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validate HTTP server settings.
pub fn validate_server(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "is required"));
    }
    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be positive"));
    }
    if config.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be positive"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
