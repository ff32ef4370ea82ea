//! `promo-coupon` — the coupon aggregate and its value objects.
//!
//! Everything here is pure and deterministic: the aggregate is the sole
//! authority on the discount-rate invariant, and no function performs IO.

pub mod coupon;
pub mod money;

pub use coupon::{Category, Coupon, CouponName, IssuablePeriod};
pub use money::{DiscountAmount, MinimumOrderAmount};
