//! Transfer service - Core business logic for moving money between accounts.
//!
//! This service handles:
//! - The transfer record and its two ledger entries
//! - Atomic balance updates in a fixed lock order
//! - Optional overdraft rejection
//!
//! # Atomicity Guarantees
//!
//! All five writes happen inside one `Store::exec_tx` session. Either all of
//! them commit, or none of them are ever visible.
//!
//! # Lock Ordering
//!
//! Balance updates take row locks. Both updates are always issued against the
//! lower account id first, so two transfers over the same pair of accounts
//! (in either direction) acquire locks in the same order and cannot deadlock.
//! Every code path that updates two balances in one transaction must keep
//! this order.

use serde::Deserialize;

use crate::models::{
    Account, AddAccountBalanceParams, CreateEntryParams, CreateTransferParams, TransferTxParams,
    TransferTxResult,
};
use crate::store::{BalanceUpdater, Queries, Store, StoreError, StoreResult};

/// What to do when a transfer would take the source balance below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdraftPolicy {
    /// Apply the debit regardless of the resulting balance.
    #[default]
    Allow,
    /// Fail with `StoreError::InsufficientFunds` and roll back.
    Reject,
}

/// Execute a transfer with the default policy (overdraft allowed).
///
/// See [`transfer_tx_with_policy`].
pub async fn transfer_tx<S: Store>(
    store: &S,
    arg: TransferTxParams,
) -> StoreResult<TransferTxResult> {
    transfer_tx_with_policy(store, arg, OverdraftPolicy::Allow).await
}

/// Execute a transfer transaction (move money between accounts).
///
/// # Process
///
/// 1. Create the transfer record
/// 2. Create the source entry (`-amount`)
/// 3. Create the destination entry (`+amount`)
/// 4. Add both balance deltas, lower account id first
/// 5. Under `OverdraftPolicy::Reject`, fail if the source went negative
/// 6. Commit (or roll back on any error)
///
/// # Preconditions
///
/// The caller has already checked that both accounts exist, share the
/// requested currency, that `amount > 0`, that the accounts differ, and that
/// the principal owns the source. None of that is re-checked here.
///
/// # Errors
///
/// Any store error aborts the whole transfer and is returned unchanged.
pub async fn transfer_tx_with_policy<S: Store>(
    store: &S,
    arg: TransferTxParams,
    policy: OverdraftPolicy,
) -> StoreResult<TransferTxResult> {
    let outcome = store
        .exec_tx(move |q| {
            Box::pin(async move {
                let transfer = q
                    .create_transfer(CreateTransferParams {
                        from_account_id: arg.from_account_id,
                        to_account_id: arg.to_account_id,
                        amount: arg.amount,
                    })
                    .await?;

                let from_entry = q
                    .create_entry(CreateEntryParams {
                        account_id: arg.from_account_id,
                        amount: -arg.amount,
                    })
                    .await?;

                let to_entry = q
                    .create_entry(CreateEntryParams {
                        account_id: arg.to_account_id,
                        amount: arg.amount,
                    })
                    .await?;

                let (from_account, to_account) = if arg.from_account_id < arg.to_account_id {
                    add_money(
                        q,
                        arg.from_account_id,
                        -arg.amount,
                        arg.to_account_id,
                        arg.amount,
                    )
                    .await?
                } else {
                    let (to_account, from_account) = add_money(
                        q,
                        arg.to_account_id,
                        arg.amount,
                        arg.from_account_id,
                        -arg.amount,
                    )
                    .await?;
                    (from_account, to_account)
                };

                if policy == OverdraftPolicy::Reject && from_account.balance < 0 {
                    return Err(StoreError::InsufficientFunds {
                        account_id: from_account.id,
                        balance: from_account.balance,
                    });
                }

                Ok(TransferTxResult {
                    transfer,
                    from_account,
                    to_account,
                    from_entry,
                    to_entry,
                })
            })
        })
        .await;

    match &outcome {
        Ok(result) => tracing::info!(
            transfer_id = result.transfer.id,
            from_account_id = arg.from_account_id,
            to_account_id = arg.to_account_id,
            amount = arg.amount,
            "transfer applied"
        ),
        Err(err) => tracing::debug!(
            from_account_id = arg.from_account_id,
            to_account_id = arg.to_account_id,
            amount = arg.amount,
            error = %err,
            "transfer rejected"
        ),
    }

    outcome
}

/// Apply two balance deltas in the order given.
///
/// Callers pass the lower account id first.
async fn add_money<Q>(
    q: &mut Q,
    account_id1: i64,
    amount1: i64,
    account_id2: i64,
    amount2: i64,
) -> StoreResult<(Account, Account)>
where
    Q: BalanceUpdater,
{
    let account1 = q
        .add_account_balance(AddAccountBalanceParams {
            id: account_id1,
            amount: amount1,
        })
        .await?;

    let account2 = q
        .add_account_balance(AddAccountBalanceParams {
            id: account_id2,
            amount: amount2,
        })
        .await?;

    Ok((account1, account2))
}
