//! Errors produced by the ledger store and the transactional executor.

use std::error::Error as StdError;

/// Convenience alias used by every store operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error taxonomy.
///
/// Neither the store nor the executor recovers from any of these; they are
/// propagated unchanged to the caller. Nothing in the store retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    ///
    /// Raised when a statement matched zero rows, and when a write referenced
    /// a missing row through a foreign key.
    #[error("record not found")]
    NotFound,

    /// The backing store is unreachable, a statement failed, or a
    /// transaction could not begin or commit.
    #[error("data access error: {0}")]
    DataAccess(#[source] Box<dyn StdError + Send + Sync>),

    /// A transaction failed and the rollback that followed failed as well.
    ///
    /// Both causes are kept so neither is lost.
    #[error("tx error: {tx_error}, rollback error: {rollback_error}")]
    RollbackFailed {
        #[source]
        tx_error: Box<StoreError>,
        rollback_error: Box<StoreError>,
    },

    /// The transaction did not finish before the executor deadline and was
    /// rolled back.
    #[error("transaction deadline exceeded")]
    Timeout,

    /// The debit would leave the account below zero while overdraft is rejected.
    #[error("insufficient funds in account {account_id}: balance would be {balance}")]
    InsufficientFunds { account_id: i64, balance: i64 },
}

impl StoreError {
    /// Wrap any backend failure as a data-access error.
    pub fn data_access<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        StoreError::DataAccess(Box::new(err))
    }

    /// Combine a failed transaction with its failed rollback.
    pub fn rollback_failed(tx_error: StoreError, rollback_error: StoreError) -> Self {
        StoreError::RollbackFailed {
            tx_error: Box::new(tx_error),
            rollback_error: Box::new(rollback_error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Map sqlx failures onto the store taxonomy.
///
/// `RowNotFound` and foreign-key violations both mean a referenced row is
/// missing. Everything else is a data-access failure.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::NotFound
            }
            _ => StoreError::data_access(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn pool_timeout_maps_to_data_access() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::DataAccess(_)));
    }

    #[test]
    fn rollback_failure_keeps_both_causes() {
        let err = StoreError::rollback_failed(
            StoreError::NotFound,
            StoreError::from(sqlx::Error::PoolClosed),
        );

        match &err {
            StoreError::RollbackFailed {
                tx_error,
                rollback_error,
            } => {
                assert!(tx_error.is_not_found());
                assert!(matches!(**rollback_error, StoreError::DataAccess(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("tx error: record not found"));
        assert!(err.source().is_some());
    }
}
