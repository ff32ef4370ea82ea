//! Bounded retry for optimistic version conflicts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use promo_core::CouponId;

use crate::error::{CouponServiceError, ServiceResult};

/// Retry policy for version-conflicted writes.
///
/// The delay is fixed, not exponential: contention windows are bounded by
/// transaction length, so waiting longer buys nothing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Run `op` until it succeeds, fails with a non-conflict error, or the
/// attempt bound is exhausted.
///
/// `op` must perform the *entire* read-modify-write — each retry re-reads
/// current state rather than replaying stale data. Exhaustion surfaces as
/// [`CouponServiceError::ConcurrencyConflict`]; the update is never silently
/// dropped and states are never merged automatically.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    coupon_id: CouponId,
    op: F,
) -> ServiceResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_version_conflict() => {
                if attempt >= max_attempts {
                    warn!(
                        coupon_id = %coupon_id,
                        attempts = attempt,
                        "version-conflict retries exhausted"
                    );
                    return Err(CouponServiceError::ConcurrencyConflict {
                        coupon_id,
                        attempts: attempt,
                    });
                }
                debug!(coupon_id = %coupon_id, attempt, "version conflict, retrying");
                tokio::time::sleep(policy.delay).await;
            }
            other => return other,
        }
    }
}
