//! Coupon repository seam and its in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use promo_core::{AggregateRoot, CouponId, ExpectedVersion};
use promo_coupon::Coupon;

use crate::error::{StoreError, StoreResult};

/// Persistent store for coupons.
///
/// Reads come in two flavors: the default read path may be replica-backed
/// and lag the primary; the authoritative path always observes the latest
/// committed state.
#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Replica-backed read; may lag the primary by a small, variable interval.
    async fn find_by_id(&self, id: CouponId) -> StoreResult<Option<Coupon>>;

    /// Primary read; never lags.
    async fn find_by_id_authoritative(&self, id: CouponId) -> StoreResult<Option<Coupon>>;

    /// Primary read with exclusive row intent. Used only on the
    /// pessimistic-lock write path.
    async fn find_by_id_for_update(&self, id: CouponId) -> StoreResult<Option<Coupon>>;

    /// Insert or version-checked update.
    ///
    /// On first save the store assigns the id and version 1. On update the
    /// aggregate's version must match the persisted version, otherwise the
    /// write fails with [`StoreError::VersionConflict`]; on success the
    /// version is bumped and the stamped aggregate returned.
    async fn save(&self, coupon: Coupon) -> StoreResult<Coupon>;
}

#[derive(Debug, Default)]
struct RepositoryInner {
    primary: RwLock<HashMap<CouponId, Coupon>>,
    replica: RwLock<HashMap<CouponId, Coupon>>,
    next_id: AtomicU64,
}

/// In-memory coupon repository with a simulated replication window.
///
/// Intended for tests/dev. A committed write becomes visible on the replica
/// map only after `replica_lag` elapses, which is enough to exercise the
/// replication-lag fallback deterministically.
#[derive(Debug, Clone)]
pub struct InMemoryCouponRepository {
    inner: Arc<RepositoryInner>,
    replica_lag: Duration,
}

impl InMemoryCouponRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                next_id: AtomicU64::new(1),
                ..RepositoryInner::default()
            }),
            replica_lag: Duration::ZERO,
        }
    }

    /// Delay before a committed write becomes visible on the replica path.
    pub fn with_replica_lag(mut self, lag: Duration) -> Self {
        self.replica_lag = lag;
        self
    }

    fn replicate(&self, coupon: Coupon) {
        if self.replica_lag.is_zero() {
            Self::apply_to_replica(&self.inner, coupon);
            return;
        }

        let inner = Arc::clone(&self.inner);
        let lag = self.replica_lag;
        tokio::spawn(async move {
            tokio::time::sleep(lag).await;
            Self::apply_to_replica(&inner, coupon);
        });
    }

    fn apply_to_replica(inner: &RepositoryInner, coupon: Coupon) {
        let Some(id) = coupon.id() else { return };
        let Ok(mut replica) = inner.replica.write() else { return };

        // Never let a slower, older write clobber a newer replica state.
        let stale = replica
            .get(&id)
            .is_some_and(|existing| existing.version() >= coupon.version());
        if !stale {
            replica.insert(id, coupon);
        }
    }
}

impl Default for InMemoryCouponRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn find_by_id(&self, id: CouponId) -> StoreResult<Option<Coupon>> {
        let replica = self
            .inner
            .replica
            .read()
            .map_err(|_| StoreError::backend("replica map lock poisoned"))?;
        Ok(replica.get(&id).cloned())
    }

    async fn find_by_id_authoritative(&self, id: CouponId) -> StoreResult<Option<Coupon>> {
        let primary = self
            .inner
            .primary
            .read()
            .map_err(|_| StoreError::backend("primary map lock poisoned"))?;
        Ok(primary.get(&id).cloned())
    }

    async fn find_by_id_for_update(&self, id: CouponId) -> StoreResult<Option<Coupon>> {
        // This backend has no row locks; exclusivity on the pessimistic path
        // comes from the distributed lock wrapped around the critical section.
        self.find_by_id_authoritative(id).await
    }

    async fn save(&self, coupon: Coupon) -> StoreResult<Coupon> {
        let stamped = {
            let mut primary = self
                .inner
                .primary
                .write()
                .map_err(|_| StoreError::backend("primary map lock poisoned"))?;

            match coupon.id() {
                None => {
                    let id = CouponId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
                    let stamped = coupon.stamped(id, 1);
                    primary.insert(id, stamped.clone());
                    debug!(coupon_id = %id, "inserted new coupon");
                    stamped
                }
                Some(id) => {
                    let current = primary.get(&id).ok_or_else(|| {
                        StoreError::backend(format!("coupon {id} is unknown to this store"))
                    })?;

                    if !ExpectedVersion::Exact(coupon.version()).matches(current.version()) {
                        return Err(StoreError::VersionConflict {
                            id,
                            expected: coupon.version(),
                            actual: current.version(),
                        });
                    }

                    let stamped = coupon.stamped(id, current.version() + 1);
                    primary.insert(id, stamped.clone());
                    debug!(coupon_id = %id, version = stamped.version(), "updated coupon");
                    stamped
                }
            }
        };

        self.replicate(stamped.clone());
        Ok(stamped)
    }
}
