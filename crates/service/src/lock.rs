//! Lock-guarded critical sections for the pessimistic write path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use promo_core::CouponId;
use promo_store::{LockService, TransactionManager, TxScope};

use crate::error::{CouponServiceError, ServiceResult};
use crate::transaction::{with_new_transaction, TxFuture};

/// Distributed lock acquisition bounds.
#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    /// Maximum time to wait for acquisition before giving up.
    pub wait: Duration,
    /// Lease TTL after which the lock self-releases, bounding the damage of
    /// a crashed holder.
    pub lease: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(1),
            lease: Duration::from_secs(5),
        }
    }
}

impl LockConfig {
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

/// Deterministic lock name for a coupon's update critical sections.
pub fn coupon_lock_name(coupon_id: CouponId) -> String {
    format!("coupon:{coupon_id}")
}

/// Runs critical sections under a named distributed lock.
///
/// The section executes inside a *new* transaction scope so the lock's
/// visible critical-section boundary matches the commit boundary exactly —
/// otherwise another process could acquire the lock and read stale
/// pre-commit state. After a successful acquisition the lock is released on
/// every exit path.
pub struct DistributedLockExecutor<L: ?Sized, M: ?Sized> {
    locks: Arc<L>,
    tx: Arc<M>,
    config: LockConfig,
}

impl<L, M> DistributedLockExecutor<L, M>
where
    L: LockService + ?Sized,
    M: TransactionManager + ?Sized,
{
    pub fn new(locks: Arc<L>, tx: Arc<M>) -> Self {
        Self {
            locks,
            tx,
            config: LockConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LockConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> LockConfig {
        self.config
    }

    /// Acquire `lock_name`, run the critical section in a fresh transaction,
    /// release.
    ///
    /// Acquisition failure surfaces [`CouponServiceError::LockTimeout`]
    /// without running the section; callers needing guaranteed execution
    /// retry at a higher level.
    pub async fn execute<T, F>(&self, lock_name: &str, critical_section: F) -> ServiceResult<T>
    where
        F: for<'a> FnOnce(&'a TxScope) -> TxFuture<'a, T>,
    {
        let acquired = self
            .locks
            .try_acquire(lock_name, self.config.wait, self.config.lease)
            .await?;

        if !acquired {
            warn!(lock_name, wait_ms = self.config.wait.as_millis() as u64, "lock not acquired");
            return Err(CouponServiceError::LockTimeout {
                lock_name: lock_name.to_string(),
                waited_ms: self.config.wait.as_millis() as u64,
            });
        }

        debug!(lock_name, "entering lock-guarded critical section");

        // The scope commits (or rolls back) before the lock is released.
        let result = with_new_transaction(self.tx.as_ref(), critical_section).await;

        if let Err(release_err) = self.locks.release(lock_name).await {
            warn!(lock_name, error = %release_err, "failed to release lock");
        }

        result
    }
}
