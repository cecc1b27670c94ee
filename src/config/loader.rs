//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_server, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_server(&config.server).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts the environment so tests don't touch process state.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let server = &mut config.server;
    if let Some(port) = parse(&lookup, "PORT")? {
        server.port = port;
    }
    if let Some(env) = lookup("NODE_ENV") {
        server.environment = Environment::from_name(&env);
    }
    if let Some(secs) = parse(&lookup, "REQUEST_TIMEOUT_SECS")? {
        server.request_timeout_secs = secs;
    }
    if let Some(bytes) = parse(&lookup, "MAX_BODY_BYTES")? {
        server.max_body_bytes = bytes;
    }

    let db = &mut config.database;
    if let Some(host) = lookup("DB_HOST") {
        db.host = Some(host);
    }
    if let Some(port) = parse_db(&lookup, "DB_PORT", "database.port", &mut db.env_errors) {
        db.port = port;
    }
    if let Some(user) = lookup("DB_USER") {
        db.user = Some(user);
    }
    if let Some(password) = lookup("DB_PASSWORD") {
        db.password = Some(password);
    }
    if let Some(name) = lookup("DB_NAME") {
        db.name = Some(name);
    }
    if let Some(max) = parse_db(&lookup, "DB_MAX_CONNECTIONS", "database.max_connections", &mut db.env_errors) {
        db.max_connections = max;
    }
    if let Some(ms) = parse_db(&lookup, "DB_IDLE_TIMEOUT_MS", "database.idle_timeout_ms", &mut db.env_errors) {
        db.idle_timeout_ms = ms;
    }
    if let Some(ms) = parse_db(
        &lookup,
        "DB_ACQUIRE_TIMEOUT_MS",
        "database.acquisition_timeout_ms",
        &mut db.env_errors,
    ) {
        db.acquisition_timeout_ms = ms;
    }

    let obs = &mut config.observability;
    if let Some(level) = lookup("LOG_LEVEL") {
        obs.log_level = level;
    }
    if let Some(addr) = lookup("METRICS_ADDRESS") {
        obs.metrics_address = Some(addr).filter(|a| !a.trim().is_empty());
    }

    Ok(())
}

fn parse<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

/// Like [`parse`], but a bad value becomes a pool validation error instead
/// of a fatal one.
fn parse_db<F, T>(lookup: &F, var: &'static str, field: &'static str, errors: &mut Vec<ValidationError>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match parse(lookup, var) {
        Ok(value) => value,
        Err(_) => {
            let value = lookup(var).unwrap_or_default();
            errors.push(ValidationError::new(field, format!("invalid value {value:?} in {var}")));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("PORT", "4000"),
                ("NODE_ENV", "production"),
                ("DB_HOST", "db"),
                ("DB_PORT", "6543"),
                ("DB_USER", "hms"),
                ("DB_PASSWORD", "secret"),
                ("DB_NAME", "hospital"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert!(config.server.environment.is_production());
        assert_eq!(config.database.host.as_deref(), Some("db"));
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.database.name.as_deref(), Some("hospital"));
        assert_eq!(config.database.max_connections, 20);
    }

    #[test]
    fn test_empty_env_keeps_defaults() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.database.host.is_none());
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_malformed_port() {
        let mut config = AppConfig::default();
        let err = apply_env(&mut config, env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "PORT", .. }));
    }

    #[test]
    fn test_malformed_database_values_disable_pool_only() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("DB_HOST", "db"),
                ("DB_USER", "hms"),
                ("DB_NAME", "hospital"),
                ("DB_PORT", ""),
                ("DB_MAX_CONNECTIONS", "many"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.max_connections, 20);

        let errors = crate::config::validation::validate_pool(&config.database).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), r#"database.port: invalid value "" in DB_PORT"#);
        assert_eq!(errors[1].field, "database.max_connections");
        assert!(validate_server(&config.server).is_ok());
    }

    #[test]
    fn test_blank_metrics_address_disables_exporter() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[("METRICS_ADDRESS", " ")])).unwrap();
        assert!(config.observability.metrics_address.is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("does-not-exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
