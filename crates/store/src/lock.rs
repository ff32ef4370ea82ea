//! Distributed lock-service seam and a leased in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Interval between acquisition attempts while waiting for a held lock.
const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Named, leased mutual exclusion shared across processes.
///
/// Acquisition waits at most `wait` and never blocks indefinitely. A granted
/// lease self-expires after `lease`, bounding the damage of a crashed holder.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Try to acquire `name`, waiting up to `wait`. Returns `false` when the
    /// lock could not be acquired within the bound.
    async fn try_acquire(&self, name: &str, wait: Duration, lease: Duration) -> StoreResult<bool>;

    /// Release `name`. Releasing an unheld or expired lock is a no-op.
    async fn release(&self, name: &str) -> StoreResult<()>;
}

/// In-memory lease table, for tests/dev.
///
/// A production deployment would back this trait with a shared lock service
/// (e.g. Redis), which is what makes the exclusion cross-process.
#[derive(Debug, Default)]
pub struct InMemoryLockService {
    leases: Mutex<HashMap<String, Instant>>,
}

impl InMemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire_once(&self, name: &str, lease: Duration) -> StoreResult<bool> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| StoreError::backend("lease table lock poisoned"))?;

        let now = Instant::now();
        if leases.get(name).is_some_and(|expires_at| *expires_at > now) {
            return Ok(false);
        }
        if leases.contains_key(name) {
            warn!(lock_name = name, "taking over an expired lease");
        }
        leases.insert(name.to_string(), now + lease);
        Ok(true)
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn try_acquire(&self, name: &str, wait: Duration, lease: Duration) -> StoreResult<bool> {
        let deadline = Instant::now() + wait;
        loop {
            if self.try_acquire_once(name, lease)? {
                debug!(lock_name = name, lease_ms = lease.as_millis() as u64, "lock acquired");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(ACQUIRE_POLL_INTERVAL).await;
        }
    }

    async fn release(&self, name: &str) -> StoreResult<()> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| StoreError::backend("lease table lock poisoned"))?;
        if leases.remove(name).is_some() {
            debug!(lock_name = name, "lock released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn acquire_succeeds_on_free_lock() {
        let locks = InMemoryLockService::new();
        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());
    }

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = InMemoryLockService::new();
        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());

        let acquired = locks
            .try_acquire("coupon:1", Duration::from_millis(50), LEASE)
            .await
            .unwrap();
        assert!(!acquired);
    }

    #[tokio::test]
    async fn release_frees_the_lock_for_the_next_holder() {
        let locks = InMemoryLockService::new();
        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());

        locks.release("coupon:1").await.unwrap();

        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let locks = InMemoryLockService::new();
        assert!(locks
            .try_acquire("coupon:1", Duration::ZERO, Duration::from_millis(20))
            .await
            .unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());
    }

    #[tokio::test]
    async fn waiting_acquire_succeeds_once_released() {
        let locks = std::sync::Arc::new(InMemoryLockService::new());
        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .try_acquire("coupon:1", Duration::from_millis(200), LEASE)
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        locks.release("coupon:1").await.unwrap();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn distinct_names_do_not_contend() {
        let locks = InMemoryLockService::new();
        assert!(locks.try_acquire("coupon:1", Duration::ZERO, LEASE).await.unwrap());
        assert!(locks.try_acquire("coupon:2", Duration::ZERO, LEASE).await.unwrap());
    }
}
