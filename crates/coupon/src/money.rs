//! Monetary value objects with self-validating ranges.

use serde::{Deserialize, Serialize};

use promo_core::{DomainError, DomainResult, ValueObject};

/// Discount amount in the smallest currency unit.
///
/// Has no independent upper bound; it is constrained relative to the minimum
/// order amount by the coupon's discount-rate invariant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountAmount(i64);

impl DiscountAmount {
    pub fn new(amount: i64) -> DomainResult<Self> {
        if amount < 0 {
            return Err(DomainError::validation(format!(
                "discount amount must not be negative, got {amount}"
            )));
        }
        Ok(Self(amount))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ValueObject for DiscountAmount {}

/// Minimum order amount in the smallest currency unit.
///
/// Valid only within the closed range `[MIN, MAX]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinimumOrderAmount(i64);

impl MinimumOrderAmount {
    pub const MIN: i64 = 5_000;
    pub const MAX: i64 = 100_000;

    pub fn new(amount: i64) -> DomainResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&amount) {
            return Err(DomainError::validation(format!(
                "minimum order amount must be between {} and {}, got {amount}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(amount))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ValueObject for MinimumOrderAmount {}
