//! Pool error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::config::ValidationError;

/// Invalid or missing pool settings.
#[derive(Debug, Clone, Error)]
#[error("invalid database configuration: {}", describe(.errors))]
pub struct ConfigurationError {
    pub errors: Vec<ValidationError>,
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The database refused or could not be reached.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConnectError {
    message: String,
}

impl ConnectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<tokio_postgres::Error> for ConnectError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Failure to obtain a lease.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// No connection became available within the acquisition timeout.
    #[error("timeout exceeded when trying to connect")]
    AcquisitionTimeout(Duration),

    /// The underlying connection could not be established.
    #[error(transparent)]
    Connection(#[from] ConnectError),

    /// The pool has been closed.
    #[error("pool is closed")]
    Closed,
}

impl PoolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::AcquisitionTimeout(_))
    }
}
