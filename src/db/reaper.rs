//! Background idle eviction.
//!
//! # Responsibilities
//! - Periodically close connections idle longer than the idle timeout
//! - Stop when the pool is closed or dropped
//!
//! # Design Decisions
//! - Holds only a weak reference, so the reaper never keeps a pool alive
//! - Each sweep locks the idle set only to partition it; closing happens
//!   after the lock is released

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::db::pool::PoolInner;

pub(crate) fn spawn_idle_reaper(pool: Weak<PoolInner>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Idle reaper starting");

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(inner) = pool.upgrade() else { break };
            if inner.is_closed() {
                break;
            }
            inner.evict_idle();
        }

        tracing::debug!("Idle reaper stopped");
    })
}
