//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a coupon.
///
/// Numeric and storage-assigned: a coupon has no id until its first save.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponId(u64);

impl CouponId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for CouponId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for CouponId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CouponId> for u64 {
    fn from(value: CouponId) -> Self {
        value.0
    }
}

impl FromStr for CouponId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = u64::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("CouponId: {e}")))?;
        Ok(Self(value))
    }
}
