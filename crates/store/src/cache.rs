//! Cache seam for coupon snapshots and its in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use promo_core::{AggregateRoot, CouponId};
use promo_coupon::Coupon;

use crate::error::{StoreError, StoreResult};

/// Keyed cache of coupon snapshots.
///
/// An entry mirrors whatever the aggregate last validated and carries no
/// independent invariant; it is always safe to drop and repopulate.
#[async_trait]
pub trait CouponCache: Send + Sync {
    async fn get(&self, id: CouponId) -> StoreResult<Option<Coupon>>;

    /// Write (or refresh) the entry for a persisted coupon.
    ///
    /// An older snapshot never replaces a newer one, so a read-path
    /// repopulation racing a write-through cannot leave the cache behind
    /// the last committed write. Caching an unsaved aggregate is a backend
    /// error: there is no key to store it under.
    async fn put(&self, coupon: &Coupon) -> StoreResult<()>;

    async fn invalidate(&self, id: CouponId) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    coupon: Coupon,
    cached_at: Instant,
}

/// In-memory coupon cache with optional TTL expiry.
#[derive(Debug, Default)]
pub struct InMemoryCouponCache {
    entries: RwLock<HashMap<CouponId, CacheEntry>>,
    ttl: Option<Duration>,
}

impl InMemoryCouponCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are treated as absent.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[async_trait]
impl CouponCache for InMemoryCouponCache {
    async fn get(&self, id: CouponId) -> StoreResult<Option<Coupon>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::backend("cache lock poisoned"))?;

        let Some(entry) = entries.get(&id) else {
            return Ok(None);
        };

        if let Some(ttl) = self.ttl {
            if entry.cached_at.elapsed() > ttl {
                return Ok(None);
            }
        }

        Ok(Some(entry.coupon.clone()))
    }

    async fn put(&self, coupon: &Coupon) -> StoreResult<()> {
        let id = coupon
            .id()
            .ok_or_else(|| StoreError::backend("cannot cache a coupon without an id"))?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::backend("cache lock poisoned"))?;

        // Never let a replica-sourced repopulation clobber a newer entry.
        let stale = entries
            .get(&id)
            .is_some_and(|existing| existing.coupon.version() > coupon.version());
        if stale {
            debug!(coupon_id = %id, version = coupon.version(), "dropping stale cache write");
            return Ok(());
        }

        entries.insert(
            id,
            CacheEntry {
                coupon: coupon.clone(),
                cached_at: Instant::now(),
            },
        );
        debug!(coupon_id = %id, version = coupon.version(), "cache entry written");
        Ok(())
    }

    async fn invalidate(&self, id: CouponId) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::backend("cache lock poisoned"))?;
        entries.remove(&id);
        Ok(())
    }
}
