//! Replication-lag-aware coupon reads.

use std::sync::Arc;

use tracing::{debug, info};

use promo_core::CouponId;
use promo_coupon::Coupon;
use promo_store::{CouponRepository, TransactionManager};

use crate::error::{CouponServiceError, ServiceResult};
use crate::transaction::with_new_transaction;

/// Reads coupons through the (possibly lagging) default path, falling back to
/// exactly one forced primary read before concluding "does not exist".
///
/// Directly after a write, a replica-backed lookup may lag the primary by a
/// small, variable interval; the one-shot authoritative fallback avoids a
/// spurious miss for freshly created data without paying primary-read cost on
/// every request.
pub struct CouponReader<R: ?Sized, M: ?Sized> {
    repository: Arc<R>,
    tx: Arc<M>,
}

impl<R, M> CouponReader<R, M>
where
    R: CouponRepository + ?Sized + 'static,
    M: TransactionManager + ?Sized,
{
    pub fn new(repository: Arc<R>, tx: Arc<M>) -> Self {
        Self { repository, tx }
    }

    /// Replica read; on a miss, one authoritative read in a fresh scope.
    ///
    /// The fallback is a single additional attempt, not a loop: if the
    /// primary also misses, the coupon does not exist.
    pub async fn find_by_id(&self, coupon_id: CouponId) -> ServiceResult<Coupon> {
        if let Some(coupon) = self.repository.find_by_id(coupon_id).await? {
            return Ok(coupon);
        }

        info!(coupon_id = %coupon_id, "replica miss, forcing a primary read");

        let repository = Arc::clone(&self.repository);
        with_new_transaction(self.tx.as_ref(), move |tx| {
            Box::pin(async move {
                debug!(tx = tx.id(), coupon_id = %coupon_id, "authoritative lookup");
                repository
                    .find_by_id_authoritative(coupon_id)
                    .await?
                    .ok_or(CouponServiceError::NotFound { coupon_id })
            })
        })
        .await
    }
}
