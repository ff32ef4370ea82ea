//! `promo-service` — orchestration of the consistency-critical coupon paths.
//!
//! Composes the domain aggregate with the store seams: read-through cache
//! population with a replication-lag fallback, and write-through updates
//! serialized either by optimistic version retry or by a leased distributed
//! lock.

pub mod error;
pub mod lock;
pub mod reader;
pub mod retry;
pub mod service;
pub mod transaction;
pub mod writer;

pub use error::{CouponServiceError, ServiceResult};
pub use lock::{coupon_lock_name, DistributedLockExecutor, LockConfig};
pub use reader::CouponReader;
pub use retry::{with_retry, RetryPolicy};
pub use service::{CouponService, WritePolicy};
pub use transaction::{with_new_transaction, TxFuture};
pub use writer::CouponWriter;
