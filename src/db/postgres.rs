//! PostgreSQL connector backed by `tokio-postgres`.

use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

use crate::db::connector::{Connection, Connector};
use crate::db::{ConnectError, PoolConfiguration};

/// Opens plain-TCP PostgreSQL connections.
#[derive(Debug, Clone, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    pub fn new() -> Self {
        Self
    }

    fn settings(config: &PoolConfiguration) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(config.host.as_deref().unwrap_or("localhost"))
            .port(config.port)
            .application_name("hospital-backend")
            .connect_timeout(config.acquisition_timeout().max(Duration::from_millis(1)));
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        if let Some(name) = &config.name {
            pg.dbname(name);
        }
        pg
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self, config: &PoolConfiguration) -> Result<Box<dyn Connection>, ConnectError> {
        let (client, connection) = Self::settings(config).connect(NoTls).await?;

        // The connection object drives the socket; it must be polled for the
        // client to make progress.
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "PostgreSQL connection terminated");
            }
        });

        tracing::debug!(host = ?config.host, port = config.port, "PostgreSQL connection opened");

        Ok(Box::new(PgConnection { client, driver }))
    }
}

/// A pooled PostgreSQL session.
///
/// Dropping the client ends the driver task once the server acknowledges
/// termination.
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgConnection {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Connection for PgConnection {
    fn is_healthy(&self) -> bool {
        !self.client.is_closed() && !self.driver.is_finished()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        // Port 1 on loopback is never a PostgreSQL server.
        let config = PoolConfiguration {
            host: Some("127.0.0.1".into()),
            port: 1,
            user: Some("hms".into()),
            name: Some("hospital".into()),
            acquisition_timeout_ms: 500,
            ..Default::default()
        };
        let result = PostgresConnector::new().connect(&config).await;
        assert!(result.is_err());
    }
}
