//! Bounded connection pool.
//!
//! # Responsibilities
//! - Hand out at most `max_connections` leases at a time
//! - Reuse idle connections, opening new ones only when none are idle
//! - Bound how long a caller waits for a lease
//! - Return or discard connections when leases are released
//! - Evict connections idle longer than `idle_timeout_ms`
//!
//! # Design Decisions
//! - A fair semaphore orders waiters by arrival; one permit per lease
//! - The idle set is a LIFO stack behind a short-held mutex, so the most
//!   recently used connection is reused first and stale ones sink to the
//!   bottom for the reaper
//! - Leases release on drop, which covers error paths and cancellation
//! - A connection is parked before its permit is freed, so a woken waiter
//!   finds it in the idle set

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::validation::validate_pool;
use crate::db::connector::{Connection, Connector};
use crate::db::reaper;
use crate::db::{ConfigurationError, PoolConfiguration, PoolError};
use crate::observability::metrics;

/// Result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Connected,
    Disconnected(String),
}

impl ProbeStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ProbeStatus::Connected)
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Physical connections opened.
    pub created: u64,
    /// Leases handed out.
    pub acquisitions: u64,
    /// Acquires that gave up after the acquisition timeout.
    pub timeouts: u64,
    /// Acquires that failed to open a connection.
    pub connect_errors: u64,
    /// Connections closed by the reaper.
    pub evicted: u64,
    /// Connections closed because they failed a health check or the pool was closed.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct AtomicPoolStats {
    created: AtomicU64,
    acquisitions: AtomicU64,
    timeouts: AtomicU64,
    connect_errors: AtomicU64,
    evicted: AtomicU64,
    discarded: AtomicU64,
}

impl AtomicPoolStats {
    fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            connect_errors: self.connect_errors.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

struct IdleConnection {
    conn: Box<dyn Connection>,
    idle_since: Instant,
}

pub(crate) struct PoolInner {
    config: PoolConfiguration,
    connector: Arc<dyn Connector>,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<IdleConnection>>,
    stats: AtomicPoolStats,
    closed: AtomicBool,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<IdleConnection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Pop a healthy, unexpired idle connection.
    fn take_idle(&self) -> Option<Box<dyn Connection>> {
        let idle_timeout = self.config.idle_timeout();
        let mut stale = Vec::new();
        let found = {
            let mut idle = self.idle();
            loop {
                match idle.pop() {
                    Some(entry) if entry.idle_since.elapsed() >= idle_timeout => stale.push(entry),
                    Some(entry) if !entry.conn.is_healthy() => stale.push(entry),
                    Some(entry) => break Some(entry.conn),
                    None => break None,
                }
            }
        };
        if !stale.is_empty() {
            AtomicPoolStats::bump(&self.stats.discarded, stale.len() as u64);
            tracing::debug!(count = stale.len(), "Discarded stale idle connections");
        }
        found
    }

    /// Park a released connection, or close it if it is no longer usable.
    ///
    /// The closed flag is checked under the idle lock; `close` sets it before
    /// draining under the same lock, so nothing is parked after the drain.
    fn put_back(&self, conn: Box<dyn Connection>) {
        if !conn.is_healthy() {
            self.discard(conn, false);
            return;
        }
        let parked = {
            let mut idle = self.idle();
            if self.is_closed() {
                Err(conn)
            } else {
                idle.push(IdleConnection {
                    conn,
                    idle_since: Instant::now(),
                });
                Ok(idle.len())
            }
        };
        let idle_count = match parked {
            Ok(count) => count,
            Err(conn) => return self.discard(conn, true),
        };
        metrics::record_pool_idle(idle_count);
    }

    fn discard(&self, conn: Box<dyn Connection>, closed: bool) {
        AtomicPoolStats::bump(&self.stats.discarded, 1);
        tracing::debug!(closed, "Discarding released connection");
        drop(conn);
    }

    /// Close idle connections unused for longer than the idle timeout.
    pub(crate) fn evict_idle(&self) -> usize {
        let idle_timeout = self.config.idle_timeout();
        let (expired, remaining) = {
            let mut idle = self.idle();
            let (expired, kept): (Vec<_>, Vec<_>) = idle
                .drain(..)
                .partition(|entry| entry.idle_since.elapsed() >= idle_timeout);
            *idle = kept;
            (expired, idle.len())
        };

        let count = expired.len();
        drop(expired);

        if count > 0 {
            AtomicPoolStats::bump(&self.stats.evicted, count as u64);
            metrics::record_pool_evictions(count);
            tracing::debug!(evicted = count, remaining, "Evicted idle connections");
        }
        metrics::record_pool_idle(remaining);
        count
    }
}

/// Handle to a shared connection pool. Cheap to clone.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("max_connections", &self.inner.config.max_connections)
            .field("idle", &self.idle_count())
            .field("leased", &self.leased_count())
            .field("closed", &self.inner.is_closed())
            .finish()
    }
}

impl Pool {
    /// Validate `config` and build a pool around `connector`.
    ///
    /// No connection is opened here. When called inside a Tokio runtime the
    /// idle reaper is started; it stops once the pool is closed or dropped.
    pub fn initialize<C: Connector>(config: PoolConfiguration, connector: C) -> Result<Self, ConfigurationError> {
        validate_pool(&config).map_err(|errors| ConfigurationError { errors })?;

        let inner = Arc::new(PoolInner {
            permits: Arc::new(Semaphore::new(config.max_connections)),
            idle: Mutex::new(Vec::with_capacity(config.max_connections)),
            connector: Arc::new(connector),
            stats: AtomicPoolStats::default(),
            closed: AtomicBool::new(false),
            config,
        });

        match tokio::runtime::Handle::try_current() {
            Ok(_) => {
                reaper::spawn_idle_reaper(Arc::downgrade(&inner), inner.config.reap_interval());
            }
            Err(_) => tracing::warn!("No Tokio runtime; idle reaper not started"),
        }

        tracing::info!(
            host = ?inner.config.host,
            port = inner.config.port,
            database = ?inner.config.name,
            max_connections = inner.config.max_connections,
            idle_timeout_ms = inner.config.idle_timeout_ms,
            acquisition_timeout_ms = inner.config.acquisition_timeout_ms,
            "Connection pool initialized"
        );

        Ok(Self { inner })
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.inner.config
    }

    /// Acquire a lease, waiting at most the configured acquisition timeout.
    pub async fn acquire(&self) -> Result<Lease, PoolError> {
        self.acquire_timeout(self.inner.config.acquisition_timeout()).await
    }

    /// Acquire a lease, waiting at most `timeout`.
    ///
    /// The timeout covers both queueing for a free slot and opening a new
    /// connection.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Lease, PoolError> {
        if self.inner.is_closed() {
            return Err(PoolError::Closed);
        }

        let start = Instant::now();
        match tokio::time::timeout(timeout, self.checkout()).await {
            Ok(Ok(lease)) => {
                AtomicPoolStats::bump(&self.inner.stats.acquisitions, 1);
                metrics::record_pool_acquire(start.elapsed());
                Ok(lease)
            }
            Ok(Err(e)) => {
                if matches!(e, PoolError::Connection(_)) {
                    AtomicPoolStats::bump(&self.inner.stats.connect_errors, 1);
                    metrics::record_pool_connect_error();
                }
                tracing::warn!(error = %e, "Failed to acquire database connection");
                Err(e)
            }
            Err(_) => {
                AtomicPoolStats::bump(&self.inner.stats.timeouts, 1);
                metrics::record_pool_timeout();
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    leased = self.leased_count(),
                    "Timed out acquiring database connection"
                );
                Err(PoolError::AcquisitionTimeout(timeout))
            }
        }
    }

    async fn checkout(&self) -> Result<Lease, PoolError> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        if let Some(conn) = self.inner.take_idle() {
            return Ok(Lease::new(conn, permit, self.inner.clone()));
        }

        // On failure the permit drops here, freeing the slot.
        let conn = self.inner.connector.connect(&self.inner.config).await?;
        AtomicPoolStats::bump(&self.inner.stats.created, 1);
        Ok(Lease::new(conn, permit, self.inner.clone()))
    }

    /// Release `lease`. Same as [`Lease::release`]; releasing twice is a no-op.
    pub fn release(&self, lease: &mut Lease) {
        lease.release();
    }

    /// One acquire+release cycle.
    pub async fn probe(&self) -> ProbeStatus {
        match self.acquire().await {
            Ok(mut lease) => {
                lease.release();
                ProbeStatus::Connected
            }
            Err(e) => ProbeStatus::Disconnected(e.to_string()),
        }
    }

    /// Run one idle-eviction sweep now. Returns how many connections closed.
    pub fn evict_idle(&self) -> usize {
        self.inner.evict_idle()
    }

    /// Connections currently parked in the idle set.
    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// Leases currently outstanding.
    pub fn leased_count(&self) -> usize {
        self.inner
            .config
            .max_connections
            .saturating_sub(self.inner.permits.available_permits())
    }

    /// Leases that could be handed out right now without waiting.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Close the pool: fail pending and future acquires and drop idle
    /// connections. Outstanding leases are discarded when released.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.permits.close();
        let drained: Vec<_> = self.inner.idle().drain(..).collect();
        AtomicPoolStats::bump(&self.inner.stats.discarded, drained.len() as u64);
        metrics::record_pool_idle(0);
        tracing::info!(closed_idle = drained.len(), "Connection pool closed");
    }
}

/// Exclusive, temporary ownership of one pooled connection.
///
/// Released explicitly with [`Lease::release`] or implicitly on drop.
pub struct Lease {
    conn: Option<Box<dyn Connection>>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<PoolInner>,
    acquired_at: Instant,
}

impl Lease {
    fn new(conn: Box<dyn Connection>, permit: OwnedSemaphorePermit, pool: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(conn),
            permit: Some(permit),
            pool,
            acquired_at: Instant::now(),
        }
    }

    /// The leased connection, or `None` once released.
    pub fn connection(&self) -> Option<&dyn Connection> {
        self.conn.as_deref()
    }

    /// The leased connection as a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.connection()?.as_any().downcast_ref::<T>()
    }

    pub fn is_released(&self) -> bool {
        self.conn.is_none()
    }

    /// How long this lease has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Return the connection to the pool. Idempotent.
    pub fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
        drop(self.permit.take());
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("released", &self.is_released())
            .field("held_for", &self.held_for())
            .finish()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.release();
    }
}
