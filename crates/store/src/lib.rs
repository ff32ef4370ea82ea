//! `promo-store` — collaborator seams and their in-memory implementations.
//!
//! The traits here are the storage, cache, lock-service, and transaction
//! boundaries of the coupon core. The in-memory implementations are intended
//! for tests/dev; persistent backends (SQL, Redis) would implement the same
//! traits.

pub mod cache;
pub mod error;
pub mod lock;
pub mod repository;
pub mod tx;

pub use cache::{CouponCache, InMemoryCouponCache};
pub use error::{StoreError, StoreResult};
pub use lock::{InMemoryLockService, LockService};
pub use repository::{CouponRepository, InMemoryCouponRepository};
pub use tx::{InMemoryTransactionManager, TransactionManager, TxScope};
