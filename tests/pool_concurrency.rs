//! Pool behaviour under concurrent load.

use std::time::Duration;

use hospital_backend::db::{MemoryConnector, Pool, PoolConfiguration, PoolError};

mod common;

#[tokio::test]
async fn test_never_exceeds_max_connections() {
    let connector = MemoryConnector::new();
    connector.set_connect_delay(Duration::from_millis(5));
    let config = PoolConfiguration {
        acquisition_timeout_ms: 5_000,
        ..common::pool_config(4)
    };
    let pool = Pool::initialize(config, connector.clone()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let pool = pool.clone();
        let connector = connector.clone();
        handles.push(tokio::spawn(async move {
            let lease = pool.acquire().await.unwrap();
            assert!(pool.leased_count() <= 4);
            assert!(connector.live() <= 4);
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(lease);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(pool.leased_count(), 0);
    assert!(connector.opened() <= 4);
    assert_eq!(pool.stats().acquisitions, 32);
    assert_eq!(pool.stats().timeouts, 0);
}

#[tokio::test]
async fn test_one_more_than_max_times_out() {
    let pool = Pool::initialize(common::pool_config(3), MemoryConnector::new()).unwrap();

    let mut held = Vec::new();
    for _ in 0..3 {
        held.push(pool.acquire().await.unwrap());
    }
    assert_eq!(pool.available(), 0);

    let started = tokio::time::Instant::now();
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, PoolError::AcquisitionTimeout(_)));
    assert!(err.is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(err.to_string(), "timeout exceeded when trying to connect");

    // Releasing the same lease twice only frees one slot.
    let mut lease = held.pop().unwrap();
    lease.release();
    pool.release(&mut lease);
    assert_eq!(pool.available(), 1);
    assert_eq!(pool.leased_count(), 2);
}

#[tokio::test]
async fn test_failed_connects_do_not_leak_slots() {
    let connector = MemoryConnector::unreachable();
    let pool = Pool::initialize(common::pool_config(2), connector.clone()).unwrap();

    for _ in 0..5 {
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));
    }
    assert_eq!(pool.available(), 2);
    assert_eq!(pool.stats().connect_errors, 5);

    connector.set_reachable(true);
    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    assert_eq!(pool.leased_count(), 2);
    drop((a, b));
    assert_eq!(pool.idle_count(), 2);
}

#[tokio::test]
async fn test_idle_connections_are_closed_by_reaper() {
    let connector = MemoryConnector::new();
    let config = PoolConfiguration {
        idle_timeout_ms: 50,
        ..common::pool_config(2)
    };
    let pool = Pool::initialize(config, connector.clone()).unwrap();

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    drop((a, b));
    assert_eq!(pool.idle_count(), 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(connector.live(), 0);
    assert_eq!(pool.stats().evicted, 2);

    // The pool keeps working after eviction.
    let lease = pool.acquire().await.unwrap();
    assert!(lease.downcast_ref::<hospital_backend::db::MemoryConnection>().is_some());
}

#[tokio::test]
async fn test_close_wakes_waiters() {
    let pool = Pool::initialize(
        PoolConfiguration {
            acquisition_timeout_ms: 5_000,
            ..common::pool_config(1)
        },
        MemoryConnector::new(),
    )
    .unwrap();
    let held = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.close();
    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(PoolError::Closed)));

    drop(held);
    assert_eq!(pool.idle_count(), 0);
}
