//! Explicit scoped-transaction seam.
//!
//! Critical sections that must observe the latest committed state (the
//! forced-primary read, the lock-guarded write) run inside a *new* scope
//! opened here, never one inherited ambiently from the caller. The scope is
//! passed into the wrapped closure by value reference, and consuming
//! `commit`/`rollback` make reuse after completion a type error.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreResult;

/// A unit of work opened by an executor and handed to a critical section.
#[derive(Debug)]
pub struct TxScope {
    id: u64,
}

impl TxScope {
    /// Scope identifier, for log correlation.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Opens, commits, and rolls back independent transaction scopes.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Open a new, independent scope. Never joins the caller's transaction.
    async fn begin(&self) -> StoreResult<TxScope>;

    async fn commit(&self, tx: TxScope) -> StoreResult<()>;

    async fn rollback(&self, tx: TxScope) -> StoreResult<()>;
}

/// Transaction bookkeeping for the in-memory backend.
///
/// Every repository call on the in-memory store is individually atomic, so
/// this manager only tracks scope identity; its value is keeping the commit
/// boundary explicit for the executors that sequence commits against lock
/// release.
#[derive(Debug, Default)]
pub struct InMemoryTransactionManager {
    next: AtomicU64,
}

impl InMemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionManager for InMemoryTransactionManager {
    async fn begin(&self) -> StoreResult<TxScope> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        debug!(tx = id, "transaction scope opened");
        Ok(TxScope { id })
    }

    async fn commit(&self, tx: TxScope) -> StoreResult<()> {
        debug!(tx = tx.id, "transaction scope committed");
        Ok(())
    }

    async fn rollback(&self, tx: TxScope) -> StoreResult<()> {
        debug!(tx = tx.id, "transaction scope rolled back");
        Ok(())
    }
}
