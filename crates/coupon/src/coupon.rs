//! The coupon aggregate.
//!
//! The aggregate owns the cross-field discount-rate invariant: every
//! construction and every field mutation re-validates it, and a violating
//! change is rejected *before* any field is touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use promo_core::{AggregateRoot, CouponId, DomainError, DomainResult, ValueObject};

use crate::money::{DiscountAmount, MinimumOrderAmount};

/// Discount rate bounds, in whole percent.
const MIN_DISCOUNT_RATE: i64 = 3;
const MAX_DISCOUNT_RATE: i64 = 20;

const MAX_NAME_LENGTH: usize = 100;

/// Human-readable coupon name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponName(String);

impl CouponName {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("coupon name must not be blank"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "coupon name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for CouponName {}

/// Merchandise category a coupon applies to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fashion,
    Electronics,
    Furniture,
    Food,
}

/// Period during which a coupon may be issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuablePeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl IssuablePeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::invariant(format!(
                "issuable period must start before it ends (start: {start}, end: {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl ValueObject for IssuablePeriod {}

/// Aggregate root: Coupon.
///
/// Identity is storage-assigned (absent before the first save) and the
/// version token is stamped by storage on every successful write; the
/// aggregate never manipulates either on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    id: Option<CouponId>,
    name: CouponName,
    discount_amount: DiscountAmount,
    minimum_order_amount: MinimumOrderAmount,
    category: Category,
    issuable_period: IssuablePeriod,
    version: u64,
    #[serde(skip)]
    dirty: bool,
}

impl Coupon {
    pub fn new(
        name: CouponName,
        discount_amount: DiscountAmount,
        minimum_order_amount: MinimumOrderAmount,
        category: Category,
        issuable_period: IssuablePeriod,
    ) -> DomainResult<Self> {
        check_discount_rate(discount_amount, minimum_order_amount)?;

        Ok(Self {
            id: None,
            name,
            discount_amount,
            minimum_order_amount,
            category,
            issuable_period,
            version: 0,
            dirty: false,
        })
    }

    pub fn name(&self) -> &CouponName {
        &self.name
    }

    pub fn discount_amount(&self) -> DiscountAmount {
        self.discount_amount
    }

    pub fn minimum_order_amount(&self) -> MinimumOrderAmount {
        self.minimum_order_amount
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn issuable_period(&self) -> IssuablePeriod {
        self.issuable_period
    }

    /// Current discount rate in whole percent (floored).
    pub fn discount_rate(&self) -> i64 {
        rate_percent(self.discount_amount, self.minimum_order_amount)
    }

    /// Whether in-memory state has diverged from the last persisted state.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Change the discount amount, re-validating the discount-rate invariant
    /// against the current minimum order amount.
    ///
    /// On violation the aggregate is left untouched.
    pub fn change_discount_amount(&mut self, new_amount: DiscountAmount) -> DomainResult<()> {
        check_discount_rate(new_amount, self.minimum_order_amount)?;
        self.discount_amount = new_amount;
        self.dirty = true;
        Ok(())
    }

    /// Change the minimum order amount, re-validating the discount-rate
    /// invariant against the current discount amount.
    ///
    /// On violation the aggregate is left untouched.
    pub fn change_minimum_order_amount(&mut self, new_amount: MinimumOrderAmount) -> DomainResult<()> {
        check_discount_rate(self.discount_amount, new_amount)?;
        self.minimum_order_amount = new_amount;
        self.dirty = true;
        Ok(())
    }

    /// Storage-facing: stamp identity and version after a successful write.
    ///
    /// Business code never calls this; the repository does, once the write
    /// has committed.
    pub fn stamped(mut self, id: CouponId, version: u64) -> Self {
        self.id = Some(id);
        self.version = version;
        self.dirty = false;
        self
    }
}

impl AggregateRoot for Coupon {
    type Id = CouponId;

    fn id(&self) -> Option<CouponId> {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Discount rate in whole percent, floored.
///
/// The product is computed in `i128`: the discount amount has no upper
/// bound, so `i64` multiplication could overflow for extreme inputs. The
/// widened quotient always fits back into `i64` because the divisor is at
/// least [`MinimumOrderAmount::MIN`].
fn rate_percent(discount: DiscountAmount, minimum_order: MinimumOrderAmount) -> i64 {
    (i128::from(discount.value()) * 100 / i128::from(minimum_order.value())) as i64
}

fn check_discount_rate(
    discount: DiscountAmount,
    minimum_order: MinimumOrderAmount,
) -> DomainResult<()> {
    let rate = rate_percent(discount, minimum_order);
    if !(MIN_DISCOUNT_RATE..=MAX_DISCOUNT_RATE).contains(&rate) {
        return Err(DomainError::invariant(format!(
            "discount rate must be between {MIN_DISCOUNT_RATE}% and {MAX_DISCOUNT_RATE}%, got {rate}%"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn test_name() -> CouponName {
        CouponName::new("lucky coupon").unwrap()
    }

    fn test_period() -> IssuablePeriod {
        let start = Utc::now();
        IssuablePeriod::new(start, start + Duration::days(7)).unwrap()
    }

    fn coupon(discount: i64, minimum_order: i64) -> DomainResult<Coupon> {
        Coupon::new(
            test_name(),
            DiscountAmount::new(discount).unwrap(),
            MinimumOrderAmount::new(minimum_order).unwrap(),
            Category::Food,
            test_period(),
        )
    }

    #[test]
    fn construction_rejects_rate_outside_bounds() {
        // 6500 / 30000 -> 21%
        let err = coupon(6_500, 30_000).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        // 2000 / 100000 -> 2%
        let err = coupon(2_000, 100_000).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn construction_rejects_extreme_discount_without_overflow() {
        // The discount has no upper bound, so the rate check must survive
        // amounts whose i64 product with 100 would overflow.
        let err = coupon(i64::MAX, 5_000).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let mut coupon = coupon(1_000, 30_000).unwrap();
        let err = coupon
            .change_discount_amount(DiscountAmount::new(i64::MAX).unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(coupon.discount_amount().value(), 1_000);
    }

    #[test]
    fn construction_accepts_rate_within_bounds() {
        let coupon = coupon(1_000, 30_000).unwrap();
        assert_eq!(coupon.discount_rate(), 3);
        assert_eq!(coupon.version(), 0);
        assert!(coupon.id().is_none());
    }

    #[test]
    fn construction_accepts_rate_boundaries() {
        // exactly 3%
        assert_eq!(coupon(300, 10_000).unwrap().discount_rate(), 3);
        // exactly 20%
        assert_eq!(coupon(2_000, 10_000).unwrap().discount_rate(), 20);
    }

    #[test]
    fn change_discount_amount_rejects_violating_rate_without_mutating() {
        let mut coupon = coupon(1_000, 30_000).unwrap();

        let err = coupon
            .change_discount_amount(DiscountAmount::new(6_500).unwrap())
            .unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(coupon.discount_amount().value(), 1_000);
        assert!(!coupon.is_dirty());
    }

    #[test]
    fn change_discount_amount_applies_valid_rate() {
        let mut coupon = coupon(1_000, 30_000).unwrap();

        coupon
            .change_discount_amount(DiscountAmount::new(2_000).unwrap())
            .unwrap();

        assert_eq!(coupon.discount_amount().value(), 2_000);
        assert!(coupon.is_dirty());
    }

    #[test]
    fn change_minimum_order_amount_rejects_violating_rate_without_mutating() {
        let mut coupon = coupon(2_000, 30_000).unwrap();

        let err = coupon
            .change_minimum_order_amount(MinimumOrderAmount::new(100_000).unwrap())
            .unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(coupon.minimum_order_amount().value(), 30_000);
    }

    #[test]
    fn change_minimum_order_amount_applies_valid_rate() {
        let mut coupon = coupon(2_000, 30_000).unwrap();

        coupon
            .change_minimum_order_amount(MinimumOrderAmount::new(40_000).unwrap())
            .unwrap();

        assert_eq!(coupon.minimum_order_amount().value(), 40_000);
    }

    #[test]
    fn issuable_period_rejects_start_not_before_end() {
        let start = Utc::now();
        let err = IssuablePeriod::new(start, start).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = IssuablePeriod::new(start, start - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn coupon_name_rejects_blank_and_overlong() {
        assert!(CouponName::new("  ").is_err());
        assert!(CouponName::new("x".repeat(101)).is_err());
        assert!(CouponName::new("flash sale").is_ok());
    }

    #[test]
    fn stamped_sets_identity_and_clears_dirty() {
        let mut coupon = coupon(1_000, 30_000).unwrap();
        coupon
            .change_discount_amount(DiscountAmount::new(1_500).unwrap())
            .unwrap();
        assert!(coupon.is_dirty());

        let coupon = coupon.stamped(CouponId::new(1), 1);

        assert_eq!(coupon.id(), Some(CouponId::new(1)));
        assert_eq!(coupon.version(), 1);
        assert!(!coupon.is_dirty());
    }

    proptest! {
        /// Construction succeeds exactly when the floored rate lands in [3, 20].
        #[test]
        fn construction_matches_rate_bounds(
            discount in 0i64..=30_000,
            minimum_order in 5_000i64..=100_000,
        ) {
            let rate = discount * 100 / minimum_order;
            let result = coupon(discount, minimum_order);
            if (3..=20).contains(&rate) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
            }
        }
    }
}
