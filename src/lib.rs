//! Hospital Management System backend library.

pub mod config;
pub mod db;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use db::{Pool, PoolConfiguration};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
