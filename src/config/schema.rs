//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the backend.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::db::PoolConfiguration;

/// Root configuration for the backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Database connection pool settings.
    pub database: PoolConfiguration,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment. Controls error detail and log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Parse an environment name. Unknown names are treated as development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Listening port.
    pub port: u16,

    /// Deployment environment.
    pub environment: Environment,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            request_timeout_secs: 30,
            max_body_bytes: 100 * 1024, // 100KB, same as express.json()
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus exporter bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.idle_timeout_ms, 30_000);
        assert_eq!(config.database.acquisition_timeout_ms, 2_000);
        assert!(config.observability.metrics_address.is_none());
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name(" Production "), Environment::Production);
        assert_eq!(Environment::from_name("test"), Environment::Test);
        assert_eq!(Environment::from_name("development"), Environment::Development);
        assert_eq!(Environment::from_name("staging"), Environment::Development);
        assert!(!Environment::Development.is_production());
    }

    #[test]
    fn test_toml_partial() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8080
            environment = "production"

            [database]
            host = "db.internal"
            max_connections = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.server.environment.is_production());
        assert_eq!(config.database.host.as_deref(), Some("db.internal"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.port, 5432);
    }
}
