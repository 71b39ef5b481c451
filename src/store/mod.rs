//! Ledger store: per-entity persistence plus the transactional executor.
//!
//! The store is split into two capabilities:
//! - [`Queries`]: one single-statement operation per entity per verb
//! - [`BalanceUpdater`]: the atomic `balance = balance + delta` primitive
//!
//! A [`Store`] hands out handles implementing both, bound either to an
//! ambient pooled connection ([`Store::conn`]) or to an active transaction
//! ([`Store::exec_tx`]). Composing several operations into one unit of work
//! is only ever done through `exec_tx`.
//!
//! Two backends are provided: [`PgStore`] for PostgreSQL and [`MemoryStore`],
//! an in-process backend with the same isolation and locking behavior.

mod error;
mod executor;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, UpdateAccountParams, User,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Future returned by the unit of work passed to [`Store::exec_tx`].
pub type TxFuture<'t, T> = BoxFuture<'t, StoreResult<T>>;

/// Per-entity CRUD operations.
///
/// Every method is one statement against the backing store. Zero matched rows
/// is reported as [`StoreError::NotFound`].
#[async_trait]
pub trait Queries: Send {
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account>;
    async fn get_account(&mut self, id: i64) -> StoreResult<Account>;
    async fn list_accounts(&mut self, arg: ListAccountsParams) -> StoreResult<Vec<Account>>;
    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account>;
    async fn delete_account(&mut self, id: i64) -> StoreResult<()>;

    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry>;
    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry>;
    async fn list_entries(&mut self, arg: ListEntriesParams) -> StoreResult<Vec<Entry>>;

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer>;
    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer>;
    async fn list_transfers(&mut self, arg: ListTransfersParams) -> StoreResult<Vec<Transfer>>;

    async fn create_user(&mut self, arg: CreateUserParams) -> StoreResult<User>;
    async fn get_user(&mut self, username: &str) -> StoreResult<User>;
}

/// Atomic balance mutation.
///
/// Implementations must apply the delta in a single statement that locks the
/// row for the rest of the enclosing transaction, never as a read followed by
/// a write.
#[async_trait]
pub trait BalanceUpdater: Send {
    async fn add_account_balance(&mut self, arg: AddAccountBalanceParams) -> StoreResult<Account>;
}

/// A backing store that can hand out query handles and run transactions.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Handle bound to an ambient pooled connection; each call autocommits.
    type Conn: Queries + BalanceUpdater;

    /// Handle bound to an active transaction.
    type Tx: Queries + BalanceUpdater;

    async fn conn(&self) -> StoreResult<Self::Conn>;

    /// Run `f` as one atomic unit.
    ///
    /// On success the transaction commits. On failure it rolls back and the
    /// error from `f` is returned; if the rollback fails too the result is
    /// [`StoreError::RollbackFailed`]. Nothing is retried.
    async fn exec_tx<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> TxFuture<'t, T> + Send + 'static;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
