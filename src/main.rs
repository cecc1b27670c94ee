//! Hospital Management System backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │               HOSPITAL BACKEND               │
//!                      │                                              │
//!   Client Request     │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ───────────────────┼─▶│middleware│──▶│  router  │──▶│ handlers │  │
//!                      │  │ (http,   │   │ (http)   │   │ (health) │  │
//!                      │  │ security)│   └──────────┘   └────┬─────┘  │
//!                      │  └──────────┘                       │        │
//!                      │       ▲                             ▼        │
//!   Client Response    │  ┌────┴─────┐                 ┌──────────┐   │    ┌──────────┐
//!   ◀──────────────────┼──│  fault   │◀────────────────│   pool   │◀──┼───▶│PostgreSQL│
//!                      │  │formatter │                 │   (db)   │   │    └──────────┘
//!                      │  └──────────┘                 └──────────┘   │
//!                      │                                              │
//!                      │  config · lifecycle · observability          │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use hospital_backend::config::load_config;
use hospital_backend::db::PostgresConnector;
use hospital_backend::health::DatabaseState;
use hospital_backend::http::HttpServer;
use hospital_backend::lifecycle::{signals, startup, Shutdown};
use hospital_backend::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "hospital-backend")]
#[command(about = "Hospital Management System backend", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init(&config.observability, config.server.environment)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        port = config.server.port,
        "hospital-backend starting"
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let database = startup::init_database(config.database.clone(), PostgresConnector::new());
    if let DatabaseState::Ready(pool) = &database {
        startup::spawn_startup_probe(pool.clone());
    }
    let pool = database.pool().ok().cloned();

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    // A failed bind is the only startup error that stops the process.
    let listener = TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Server running on http://localhost:{}",
        config.server.port
    );

    let server = HttpServer::new(config.server, database);
    server.run(listener, shutdown.subscribe()).await?;

    if let Some(pool) = pool {
        pool.close();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
