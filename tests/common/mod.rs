//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hospital_backend::config::{Environment, ServerConfig};
use hospital_backend::db::{MemoryConnector, Pool, PoolConfiguration};
use hospital_backend::health::DatabaseState;
use hospital_backend::http::{AppState, HttpServer};
use hospital_backend::lifecycle::Shutdown;
use tokio::net::TcpListener;

/// A complete pool configuration with a short acquisition timeout.
pub fn pool_config(max_connections: usize) -> PoolConfiguration {
    PoolConfiguration {
        host: Some("localhost".into()),
        user: Some("hms".into()),
        password: Some("hms".into()),
        name: Some("hospital".into()),
        max_connections,
        acquisition_timeout_ms: 200,
        ..Default::default()
    }
}

/// A running server and the handles needed to steer it.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub pool: Pool,
    pub connector: MemoryConnector,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

#[allow(dead_code)]
/// Start a server on an ephemeral port backed by an in-memory database.
pub async fn start_server(
    connector: MemoryConnector,
    environment: Environment,
    max_connections: usize,
    routes: Router<AppState>,
) -> TestServer {
    let pool = Pool::initialize(pool_config(max_connections), connector.clone()).unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        environment,
        ..Default::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::with_routes(config, DatabaseState::Ready(pool.clone()), routes);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        pool,
        connector,
        shutdown,
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
