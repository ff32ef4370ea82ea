//! Store-layer error model.

use thiserror::Error;

use promo_core::CouponId;

/// Result type used across the store layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a storage/cache/lock collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The persisted version no longer matches the version the writer read.
    ///
    /// Recoverable by re-reading current state and replaying the operation.
    #[error("version conflict on coupon {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: CouponId,
        expected: u64,
        actual: u64,
    },

    /// The backend itself failed (poisoned lock, serialization, connectivity).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
