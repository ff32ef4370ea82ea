//! Service-level error model: the final surfaced failure kinds.

use thiserror::Error;

use promo_core::{CouponId, DomainError};
use promo_store::StoreError;

/// Result type used across the service layer.
pub type ServiceResult<T> = Result<T, CouponServiceError>;

/// Failure surfaced to callers of the coupon service.
///
/// Every variant carries enough context (entity id, attempted operation) to
/// log and alert on; nothing is silently swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponServiceError {
    /// Validation or invariant failure from the domain. Never persisted,
    /// never retried.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Neither the replica nor the authoritative read found the coupon.
    #[error("coupon {coupon_id} not found")]
    NotFound { coupon_id: CouponId },

    /// The conflict-retry bound was exhausted without a successful commit.
    #[error("concurrent update conflict on coupon {coupon_id} after {attempts} attempts")]
    ConcurrencyConflict { coupon_id: CouponId, attempts: u32 },

    /// The distributed lock was not acquired within its wait bound.
    #[error("could not acquire lock '{lock_name}' within {waited_ms} ms")]
    LockTimeout { lock_name: String, waited_ms: u64 },

    /// Store-layer failure, including in-flight version conflicts before the
    /// retry executor resolves or surfaces them.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CouponServiceError {
    /// Whether this failure is a recoverable optimistic-locking conflict.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_version_conflict())
    }
}
