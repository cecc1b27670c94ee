//! Connection factory abstraction.
//!
//! # Responsibilities
//! - Open physical connections for the pool
//! - Report whether a connection is still usable
//!
//! # Design Decisions
//! - The pool only sees trait objects, so tests swap PostgreSQL for
//!   [`MemoryConnector`] without touching pool code
//! - Closing a connection is dropping it

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::db::{ConnectError, PoolConfiguration};

/// A physical database connection owned by the pool.
pub trait Connection: Send + Sync + 'static {
    /// Cheap, non-blocking liveness check used on borrow and on release.
    fn is_healthy(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Opens new connections on demand.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, config: &PoolConfiguration) -> Result<Box<dyn Connection>, ConnectError>;
}

/// In-memory connector for tests and running without a database.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    unreachable: AtomicBool,
    broken: Arc<AtomicBool>,
    connect_delay_ms: AtomicUsize,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose database refuses every connection.
    pub fn unreachable() -> Self {
        let connector = Self::default();
        connector.set_reachable(false);
        connector
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Mark every connection, existing and future, as failing its health check.
    pub fn set_broken(&self, broken: bool) {
        self.state.broken.store(broken, Ordering::SeqCst);
    }

    /// Delay each connect call, simulating a slow handshake.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.state
            .connect_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Total connections opened so far.
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Total connections closed (dropped) so far.
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Connections currently open.
    pub fn live(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &PoolConfiguration) -> Result<Box<dyn Connection>, ConnectError> {
        let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(ConnectError::new(format!(
                "connect ECONNREFUSED {}:{}",
                config.host.as_deref().unwrap_or("localhost"),
                config.port
            )));
        }

        let id = self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            id,
            broken: self.state.broken.clone(),
            closed: self.state.closed.clone(),
        }))
    }
}

/// Connection handed out by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryConnection {
    id: usize,
    broken: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
}

impl MemoryConnection {
    /// Sequence number in open order, starting at zero.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Connection for MemoryConnection {
    fn is_healthy(&self) -> bool {
        !self.broken.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
