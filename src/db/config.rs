//! Pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ValidationError;

/// Connection pool settings.
///
/// Required fields are optional here so a partially configured environment
/// still deserializes; [`crate::db::Pool::initialize`] rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfiguration {
    /// Database server host.
    pub host: Option<String>,

    /// Database server port.
    pub port: u16,

    /// Login role.
    pub user: Option<String>,

    /// Login password.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Database name.
    pub name: Option<String>,

    /// Maximum concurrent leases (and physical connections).
    pub max_connections: usize,

    /// Idle connections older than this are closed by the reaper.
    pub idle_timeout_ms: u64,

    /// How long `acquire` waits before giving up.
    pub acquisition_timeout_ms: u64,

    /// Environment overrides that did not parse. Reported when the pool is
    /// validated, so a bad database setting never stops the HTTP server.
    #[serde(skip)]
    pub env_errors: Vec<ValidationError>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            host: None,
            port: 5432,
            user: None,
            password: None,
            name: None,
            max_connections: 20,
            idle_timeout_ms: 30_000,
            acquisition_timeout_ms: 2_000,
            env_errors: Vec::new(),
        }
    }
}

impl PoolConfiguration {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }

    /// Interval between reaper sweeps: a quarter of the idle timeout,
    /// clamped to `[10ms, 5s]`.
    pub fn reap_interval(&self) -> Duration {
        (self.idle_timeout() / 4).clamp(Duration::from_millis(10), Duration::from_secs(5))
    }
}
