//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /           → liveness.rs (process only, never touches the pool)
//! GET /health/db  → database.rs
//!                     → DatabaseState::probe (acquire + release)
//!                     → 200 connected | 500 disconnected
//! ```
//!
//! # Design Decisions
//! - Liveness must succeed whenever the process runs, database or not
//! - A pool that failed to initialize is reported, not hidden

pub mod database;
pub mod liveness;

use crate::db::{ConfigurationError, Pool, ProbeStatus};

pub use database::{database_health, DatabaseHealth};
pub use liveness::{liveness, Liveness};

/// The database as seen by the HTTP layer.
#[derive(Debug, Clone)]
pub enum DatabaseState {
    /// Pool built; connections may or may not be reachable.
    Ready(Pool),
    /// Pool settings were rejected at startup.
    Unavailable(ConfigurationError),
}

impl DatabaseState {
    pub fn pool(&self) -> Result<&Pool, ConfigurationError> {
        match self {
            DatabaseState::Ready(pool) => Ok(pool),
            DatabaseState::Unavailable(e) => Err(e.clone()),
        }
    }

    pub async fn probe(&self) -> ProbeStatus {
        match self {
            DatabaseState::Ready(pool) => pool.probe().await,
            DatabaseState::Unavailable(e) => ProbeStatus::Disconnected(e.to_string()),
        }
    }
}
