//! Cache-synchronized coupon service: the composed read and write paths.

use std::sync::Arc;

use tracing::{debug, info};

use promo_core::{AggregateRoot, CouponId, DomainResult};
use promo_coupon::{Coupon, DiscountAmount, MinimumOrderAmount};
use promo_store::{CouponCache, CouponRepository, LockService, TransactionManager};

use crate::error::ServiceResult;
use crate::lock::{coupon_lock_name, DistributedLockExecutor, LockConfig};
use crate::reader::CouponReader;
use crate::retry::{with_retry, RetryPolicy};
use crate::writer::CouponWriter;

/// How concurrent updates to the same coupon are serialized.
///
/// Both strategies guarantee the persisted state is a version that passed
/// full invariant validation; they differ in contention cost. Optimistic
/// retry is the default because coupon updates are rare enough that
/// conflicts are the exception, not the rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Version-checked writes, re-attempted on conflict up to the retry
    /// bound.
    #[default]
    OptimisticRetry,
    /// One writer at a time per coupon, serialized by a leased distributed
    /// lock.
    PessimisticLock,
}

/// Coupon workflows with the cache kept synchronized on every path.
///
/// Reads populate the cache from the store ([`CouponReader`] handles the
/// replication-lag fallback); writes refresh the cached entry with the
/// committed state in the same call, so a read immediately after a
/// successful update observes that update regardless of replica lag.
pub struct CouponService<R: ?Sized, C: ?Sized, L: ?Sized, M: ?Sized> {
    reader: CouponReader<R, M>,
    writer: CouponWriter<R>,
    cache: Arc<C>,
    locks: DistributedLockExecutor<L, M>,
    retry: RetryPolicy,
    policy: WritePolicy,
}

impl<R, C, L, M> CouponService<R, C, L, M>
where
    R: CouponRepository + ?Sized + 'static,
    C: CouponCache + ?Sized,
    L: LockService + ?Sized,
    M: TransactionManager + ?Sized,
{
    pub fn new(repository: Arc<R>, cache: Arc<C>, locks: Arc<L>, tx: Arc<M>) -> Self {
        Self {
            reader: CouponReader::new(Arc::clone(&repository), Arc::clone(&tx)),
            writer: CouponWriter::new(repository),
            cache,
            locks: DistributedLockExecutor::new(locks, tx),
            retry: RetryPolicy::default(),
            policy: WritePolicy::default(),
        }
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_lock_config(mut self, config: LockConfig) -> Self {
        self.locks = self.locks.with_config(config);
        self
    }

    /// Persist a new coupon and write it through to the cache.
    pub async fn create(&self, coupon: Coupon) -> ServiceResult<Coupon> {
        let saved = self.writer.save(coupon).await?;
        self.cache.put(&saved).await?;
        if let Some(id) = saved.id() {
            info!(coupon_id = %id, "coupon created");
        }
        Ok(saved)
    }

    /// Cache-first lookup; a miss goes through the lag-aware reader and
    /// repopulates the cache.
    pub async fn find_by_id(&self, coupon_id: CouponId) -> ServiceResult<Coupon> {
        if let Some(coupon) = self.cache.get(coupon_id).await? {
            debug!(coupon_id = %coupon_id, "cache hit");
            return Ok(coupon);
        }

        let coupon = self.reader.find_by_id(coupon_id).await?;
        self.cache.put(&coupon).await?;
        Ok(coupon)
    }

    /// Change the coupon's discount amount, revalidating the discount-rate
    /// invariant against the current minimum order amount.
    pub async fn update_discount_amount(
        &self,
        coupon_id: CouponId,
        amount: i64,
    ) -> ServiceResult<Coupon> {
        let new_amount = DiscountAmount::new(amount)?;
        self.update(coupon_id, move |coupon| {
            coupon.change_discount_amount(new_amount)
        })
        .await
    }

    /// Change the coupon's minimum order amount, revalidating the
    /// discount-rate invariant against the current discount amount.
    pub async fn update_minimum_order_amount(
        &self,
        coupon_id: CouponId,
        amount: i64,
    ) -> ServiceResult<Coupon> {
        let new_amount = MinimumOrderAmount::new(amount)?;
        self.update(coupon_id, move |coupon| {
            coupon.change_minimum_order_amount(new_amount)
        })
        .await
    }

    /// Run one mutation through the configured write path and write the
    /// committed state through to the cache.
    ///
    /// `apply` must be safe to re-run: under optimistic retry it executes
    /// once per attempt, each time against freshly read state.
    async fn update<F>(&self, coupon_id: CouponId, apply: F) -> ServiceResult<Coupon>
    where
        F: Fn(&mut Coupon) -> DomainResult<()> + Clone + Send + Sync + 'static,
    {
        let updated = match self.policy {
            WritePolicy::OptimisticRetry => {
                with_retry(self.retry, coupon_id, || {
                    self.writer.update(coupon_id, apply.clone())
                })
                .await?
            }
            WritePolicy::PessimisticLock => {
                let writer = self.writer.clone();
                self.locks
                    .execute(&coupon_lock_name(coupon_id), move |_tx| {
                        Box::pin(async move { writer.update_exclusive(coupon_id, apply).await })
                    })
                    .await?
            }
        };

        // Only committed state reaches the cache; a failed update leaves the
        // previous entry intact.
        self.cache.put(&updated).await?;
        debug!(
            coupon_id = %coupon_id,
            version = updated.version(),
            "coupon updated and cache refreshed"
        );
        Ok(updated)
    }
}
