//! Backend-independent commit/rollback driver behind `Store::exec_tx`.

use std::time::Duration;

use async_trait::async_trait;

use super::{StoreError, StoreResult, TxFuture};

/// Finishing half of a transaction handle.
#[async_trait]
pub(crate) trait TxHandle: Send + Sized {
    async fn commit(self) -> StoreResult<()>;
    async fn rollback(self) -> StoreResult<()>;
}

/// Run `f` against an already-begun transaction and finish it.
pub(crate) async fn run<H, T, F>(mut handle: H, deadline: Option<Duration>, f: F) -> StoreResult<T>
where
    H: TxHandle,
    F: for<'t> FnOnce(&'t mut H) -> TxFuture<'t, T>,
{
    let outcome = match deadline {
        Some(limit) => match tokio::time::timeout(limit, f(&mut handle)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(StoreError::Timeout),
        },
        None => f(&mut handle).await,
    };

    match outcome {
        Ok(value) => {
            handle.commit().await?;
            Ok(value)
        }
        Err(tx_error) => match handle.rollback().await {
            Ok(()) => {
                tracing::warn!(error = %tx_error, "transaction rolled back");
                Err(tx_error)
            }
            Err(rollback_error) => {
                tracing::error!(
                    error = %tx_error,
                    rollback_error = %rollback_error,
                    "transaction rollback failed"
                );
                Err(StoreError::rollback_failed(tx_error, rollback_error))
            }
        },
    }
}
