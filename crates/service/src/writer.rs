//! Coupon persistence attempts: save and read-modify-write.

use std::sync::Arc;

use promo_core::{CouponId, DomainResult};
use promo_coupon::Coupon;
use promo_store::CouponRepository;

use crate::error::{CouponServiceError, ServiceResult};

/// Executes single write attempts against the repository.
///
/// Each update is one complete read-modify-write: read current authoritative
/// state, apply the mutation (which re-validates the invariant), persist.
/// Conflict handling and locking live a layer above.
pub struct CouponWriter<R: ?Sized> {
    repository: Arc<R>,
}

impl<R: ?Sized> Clone for CouponWriter<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> CouponWriter<R>
where
    R: CouponRepository + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn save(&self, coupon: Coupon) -> ServiceResult<Coupon> {
        Ok(self.repository.save(coupon).await?)
    }

    /// One optimistic read-modify-write attempt.
    ///
    /// Reads the authoritative path so a retry always starts from the latest
    /// committed state.
    pub async fn update<F>(&self, coupon_id: CouponId, apply: F) -> ServiceResult<Coupon>
    where
        F: Fn(&mut Coupon) -> DomainResult<()>,
    {
        let mut coupon = self
            .repository
            .find_by_id_authoritative(coupon_id)
            .await?
            .ok_or(CouponServiceError::NotFound { coupon_id })?;

        apply(&mut coupon)?;
        Ok(self.repository.save(coupon).await?)
    }

    /// One read-modify-write attempt through the exclusive read, for the
    /// lock-guarded path.
    pub async fn update_exclusive<F>(&self, coupon_id: CouponId, apply: F) -> ServiceResult<Coupon>
    where
        F: Fn(&mut Coupon) -> DomainResult<()>,
    {
        let mut coupon = self
            .repository
            .find_by_id_for_update(coupon_id)
            .await?
            .ok_or(CouponServiceError::NotFound { coupon_id })?;

        apply(&mut coupon)?;
        Ok(self.repository.save(coupon).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use promo_core::{AggregateRoot, DomainError};
    use promo_coupon::{Category, CouponName, DiscountAmount, IssuablePeriod, MinimumOrderAmount};
    use promo_store::InMemoryCouponRepository;

    fn test_coupon() -> Coupon {
        let start = Utc::now();
        Coupon::new(
            CouponName::new("coupon").unwrap(),
            DiscountAmount::new(1_000).unwrap(),
            MinimumOrderAmount::new(30_000).unwrap(),
            Category::Electronics,
            IssuablePeriod::new(start, start + chrono::Duration::days(7)).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn update_applies_mutation_and_persists() {
        let repo = InMemoryCouponRepository::new();
        let writer = CouponWriter::new(Arc::new(repo));
        let saved = writer.save(test_coupon()).await.unwrap();

        let updated = writer
            .update(saved.id().unwrap(), |c| {
                c.change_discount_amount(DiscountAmount::new(1_500).unwrap())
            })
            .await
            .unwrap();

        assert_eq!(updated.discount_amount().value(), 1_500);
        assert_eq!(updated.version(), 2);
    }

    #[tokio::test]
    async fn invariant_violation_aborts_before_persisting() {
        let repo = InMemoryCouponRepository::new();
        let writer = CouponWriter::new(Arc::new(repo));
        let saved = writer.save(test_coupon()).await.unwrap();
        let id = saved.id().unwrap();

        let err = writer
            .update(id, |c| {
                c.change_discount_amount(DiscountAmount::new(6_500).unwrap())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CouponServiceError::Domain(DomainError::InvariantViolation(_))
        ));

        // Nothing was persisted.
        let current = writer.update(id, |_| Ok(())).await.unwrap();
        assert_eq!(current.discount_amount().value(), 1_000);
    }

    #[tokio::test]
    async fn update_of_missing_coupon_is_not_found() {
        let writer = CouponWriter::new(Arc::new(InMemoryCouponRepository::new()));

        let err = writer.update(CouponId::new(9), |_| Ok(())).await.unwrap_err();

        assert_eq!(
            err,
            CouponServiceError::NotFound {
                coupon_id: CouponId::new(9)
            }
        );
    }
}
