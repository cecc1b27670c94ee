//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the connection pool from configuration
//! - Probe the database once in the background
//!
//! # Design Decisions
//! - Invalid pool settings and an unreachable database are logged, never
//!   fatal: the HTTP server must come up to report its own health
//! - The boot probe runs concurrently with binding the listener

use tokio::task::JoinHandle;

use crate::db::{Connector, Pool, PoolConfiguration, ProbeStatus};
use crate::health::DatabaseState;

/// Build the pool, degrading to [`DatabaseState::Unavailable`] on bad config.
pub fn init_database<C: Connector>(config: PoolConfiguration, connector: C) -> DatabaseState {
    match Pool::initialize(config, connector) {
        Ok(pool) => DatabaseState::Ready(pool),
        Err(e) => {
            tracing::error!(error = %e, "Database pool unavailable; continuing without it");
            DatabaseState::Unavailable(e)
        }
    }
}

/// Run one probe without blocking startup; the result is only logged.
pub fn spawn_startup_probe(pool: Pool) -> JoinHandle<ProbeStatus> {
    tokio::spawn(async move {
        let status = pool.probe().await;
        match &status {
            ProbeStatus::Connected => {
                tracing::info!(
                    host = ?pool.config().host,
                    database = ?pool.config().name,
                    "Connected to PostgreSQL database"
                );
            }
            ProbeStatus::Disconnected(reason) => {
                tracing::error!(error = %reason, "Database connection failed at startup");
            }
        }
        status
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryConnector;

    fn valid() -> PoolConfiguration {
        PoolConfiguration {
            host: Some("localhost".into()),
            user: Some("hms".into()),
            name: Some("hospital".into()),
            acquisition_timeout_ms: 100,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_config_degrades() {
        let state = init_database(PoolConfiguration::default(), MemoryConnector::new());
        assert!(matches!(state, DatabaseState::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_fatal() {
        let state = init_database(valid(), MemoryConnector::unreachable());
        let DatabaseState::Ready(pool) = state else {
            panic!("valid config should build a pool");
        };
        let status = spawn_startup_probe(pool.clone()).await.unwrap();
        assert!(!status.is_connected());
        assert_eq!(pool.leased_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_success() {
        let DatabaseState::Ready(pool) = init_database(valid(), MemoryConnector::new()) else {
            panic!("valid config should build a pool");
        };
        assert!(spawn_startup_probe(pool.clone()).await.unwrap().is_connected());
        assert_eq!(pool.idle_count(), 1);
    }
}
