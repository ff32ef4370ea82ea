//! Critical sections wrapped in a new, independent transaction scope.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use promo_store::{TransactionManager, TxScope};

use crate::error::ServiceResult;

/// Future produced by a critical section, tied to its transaction scope.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ServiceResult<T>> + Send + 'a>>;

/// Open a fresh transaction scope, run the critical section against it, and
/// commit on success / roll back on failure.
///
/// The scope is always new — never inherited from the caller — so a wrapped
/// section observes the latest committed state and its own commit boundary
/// is exactly the scope's.
pub async fn with_new_transaction<M, T, F>(manager: &M, critical_section: F) -> ServiceResult<T>
where
    M: TransactionManager + ?Sized,
    F: for<'a> FnOnce(&'a TxScope) -> TxFuture<'a, T>,
{
    let tx = manager.begin().await?;
    match critical_section(&tx).await {
        Ok(value) => {
            manager.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = manager.rollback(tx).await {
                warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_core::DomainError;
    use promo_store::InMemoryTransactionManager;

    #[tokio::test]
    async fn commits_on_success() {
        let manager = InMemoryTransactionManager::new();
        let value = with_new_transaction(&manager, |tx| {
            let id = tx.id();
            Box::pin(async move { Ok(id) })
        })
        .await
        .unwrap();
        // Scope id is observable inside the section.
        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn rolls_back_and_propagates_on_failure() {
        let manager = InMemoryTransactionManager::new();
        let err: crate::error::CouponServiceError = with_new_transaction(&manager, |_tx| {
            Box::pin(async move { Err::<(), _>(DomainError::invariant("nope").into()) })
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            crate::error::CouponServiceError::Domain(DomainError::InvariantViolation(_))
        ));
    }
}
