//! Database connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! PoolConfiguration
//!     → Pool::initialize (validate, start reaper)
//!     → acquire() → Lease ─┬─ idle set (reuse)
//!                          └─ Connector::connect (open new)
//!     → Lease::release / drop → idle set or discard
//!     → reaper.rs closes connections idle past the timeout
//! ```
//!
//! # Design Decisions
//! - The pool is an explicit value injected into the HTTP layer, never a global
//! - Connections come from a [`Connector`], so PostgreSQL is swappable for
//!   [`MemoryConnector`] in tests

pub mod config;
pub mod connector;
pub mod error;
pub mod pool;
pub mod postgres;
mod reaper;

pub use config::PoolConfiguration;
pub use connector::{Connection, Connector, MemoryConnection, MemoryConnector};
pub use error::{ConfigurationError, ConnectError, PoolError};
pub use pool::{Lease, Pool, PoolStats, ProbeStatus};
pub use postgres::{PgConnection, PostgresConnector};
