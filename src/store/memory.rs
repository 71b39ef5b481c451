//! In-process implementation of the ledger store.
//!
//! Mirrors the PostgreSQL behavior the transfer engine depends on:
//!
//! - writes made inside a transaction are buffered and only become visible
//!   to others on commit; rollback (or dropping the handle) discards them
//! - every account write takes a row lock that is held until the transaction
//!   ends; waiting longer than `lock_timeout` fails like a database lock timeout
//! - identifier sequences are not transactional, so rolled-back inserts leave gaps
//! - foreign keys are checked on inserts and on account deletion
//!
//! It also supports fault injection so tests can make any operation, or a
//! rollback, fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::executor::{self, TxHandle};
use super::{BalanceUpdater, Queries, Store, StoreError, StoreResult, TxFuture};
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, UpdateAccountParams, User,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend-specific failures, surfaced as `StoreError::DataAccess`.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("timed out waiting for row lock on account {0}")]
    LockTimeout(i64),

    #[error("duplicate key value violates unique constraint on {0}")]
    UniqueViolation(&'static str),

    #[error("account {0} is still referenced by ledger rows")]
    StillReferenced(i64),

    #[error("balance overflow on account {0}")]
    BalanceOverflow(i64),

    #[error("injected fault in {0}")]
    InjectedFault(&'static str),

    #[error("store state poisoned")]
    Poisoned,
}

impl From<MemoryError> for StoreError {
    fn from(err: MemoryError) -> Self {
        StoreError::data_access(err)
    }
}

impl<T> From<PoisonError<T>> for MemoryError {
    fn from(_: PoisonError<T>) -> Self {
        MemoryError::Poisoned
    }
}

/// Committed table contents and id sequences.
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, Entry>,
    transfers: BTreeMap<i64, Transfer>,
    account_seq: i64,
    entry_seq: i64,
    transfer_seq: i64,
}

impl Tables {
    fn next_account_id(&mut self) -> i64 {
        self.account_seq += 1;
        self.account_seq
    }

    fn next_entry_id(&mut self) -> i64 {
        self.entry_seq += 1;
        self.entry_seq
    }

    fn next_transfer_id(&mut self) -> i64 {
        self.transfer_seq += 1;
        self.transfer_seq
    }
}

/// A pending failure: the `skip + 1`-th call to `operation` fails.
#[derive(Debug)]
struct Fault {
    operation: &'static str,
    skip: usize,
}

#[derive(Debug, Default)]
struct Faults {
    pending: Vec<Fault>,
    fail_next_rollback: bool,
}

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<i64, Arc<RowLock<()>>>>,
    faults: Mutex<Faults>,
    lock_timeout: Duration,
}

impl Shared {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, MemoryError> {
        Ok(self.tables.lock()?)
    }

    fn check_fault(&self, operation: &'static str) -> Result<(), MemoryError> {
        let mut faults = self.faults.lock()?;
        let Some(index) = faults
            .pending
            .iter()
            .position(|fault| fault.operation == operation)
        else {
            return Ok(());
        };

        if faults.pending[index].skip == 0 {
            faults.pending.remove(index);
            return Err(MemoryError::InjectedFault(operation));
        }
        faults.pending[index].skip -= 1;
        Ok(())
    }

    fn take_rollback_fault(&self) -> Result<bool, MemoryError> {
        let mut faults = self.faults.lock()?;
        Ok(std::mem::take(&mut faults.fail_next_rollback))
    }

    async fn lock_row(&self, id: i64) -> Result<OwnedMutexGuard<()>, MemoryError> {
        let row = {
            let mut locks = self.row_locks.lock()?;
            // An entry only the map refers to has no holder and no waiter.
            locks.retain(|_, row| Arc::strong_count(row) > 1);
            locks.entry(id).or_default().clone()
        };

        tokio::time::timeout(self.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| MemoryError::LockTimeout(id))
    }
}

/// In-memory store. Cloning shares the same underlying tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    tx_timeout: Option<Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                faults: Mutex::new(Faults::default()),
                lock_timeout,
            }),
            tx_timeout: None,
        }
    }

    /// Roll back any transaction still running after `limit`.
    pub fn with_tx_timeout(mut self, limit: Option<Duration>) -> Self {
        self.tx_timeout = limit;
        self
    }

    /// Make the `skip + 1`-th future call to `operation` fail.
    ///
    /// `operation` is a method name such as `"create_entry"`, or `"commit"`.
    pub fn fail_on(&self, operation: &'static str, skip: usize) {
        let mut faults = self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.pending.push(Fault { operation, skip });
    }

    /// Make the next transaction rollback fail after discarding its writes.
    pub fn fail_next_rollback(&self) {
        let mut faults = self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.fail_next_rollback = true;
    }

    /// Start a handle bound to a new transaction.
    pub(crate) fn begin(&self) -> MemQueries {
        MemQueries {
            shared: self.shared.clone(),
            tx: Some(TxState::default()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Conn = MemQueries;
    type Tx = MemQueries;

    async fn conn(&self) -> StoreResult<Self::Conn> {
        Ok(MemQueries {
            shared: self.shared.clone(),
            tx: None,
        })
    }

    async fn exec_tx<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> TxFuture<'t, T> + Send + 'static,
    {
        executor::run(self.begin(), self.tx_timeout, f).await
    }

    async fn ping(&self) -> StoreResult<()> {
        drop(self.shared.tables()?);
        Ok(())
    }
}

/// Writes buffered by an open transaction.
#[derive(Debug, Default)]
struct TxState {
    /// `None` marks a row deleted by this transaction.
    accounts: BTreeMap<i64, Option<Account>>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    users: Vec<User>,
    locks: HashMap<i64, OwnedMutexGuard<()>>,
}

/// Query handle for [`MemoryStore`].
///
/// With no open transaction every write commits immediately.
#[derive(Debug)]
pub struct MemQueries {
    shared: Arc<Shared>,
    tx: Option<TxState>,
}

impl MemQueries {
    /// Account as seen by this handle: own pending writes first, then committed rows.
    fn visible_account(&self, tables: &Tables, id: i64) -> Option<Account> {
        if let Some(pending) = self.tx.as_ref().and_then(|tx| tx.accounts.get(&id)) {
            return pending.clone();
        }
        tables.accounts.get(&id).cloned()
    }

    fn visible_user_exists(&self, tables: &Tables, username: &str) -> bool {
        tables.users.contains_key(username)
            || self
                .tx
                .as_ref()
                .is_some_and(|tx| tx.users.iter().any(|user| user.username == username))
    }

    fn visible_accounts(&self, tables: &Tables) -> Vec<Account> {
        let mut merged: BTreeMap<i64, Option<Account>> = tables
            .accounts
            .iter()
            .map(|(id, account)| (*id, Some(account.clone())))
            .collect();
        if let Some(tx) = &self.tx {
            for (id, pending) in &tx.accounts {
                merged.insert(*id, pending.clone());
            }
        }
        merged.into_values().flatten().collect()
    }

    fn visible_entries(&self, tables: &Tables) -> Vec<Entry> {
        let mut entries: Vec<Entry> = tables.entries.values().cloned().collect();
        if let Some(tx) = &self.tx {
            entries.extend(tx.entries.iter().cloned());
        }
        entries
    }

    fn visible_transfers(&self, tables: &Tables) -> Vec<Transfer> {
        let mut transfers: Vec<Transfer> = tables.transfers.values().cloned().collect();
        if let Some(tx) = &self.tx {
            transfers.extend(tx.transfers.iter().cloned());
        }
        transfers
    }

    /// Take the row lock for `id`, keeping it for the rest of the transaction.
    ///
    /// Outside a transaction the guard is returned and released by the caller.
    async fn lock_account(&mut self, id: i64) -> StoreResult<Option<OwnedMutexGuard<()>>> {
        if let Some(tx) = &self.tx {
            if tx.locks.contains_key(&id) {
                return Ok(None);
            }
        }

        let guard = self.shared.lock_row(id).await?;
        match &mut self.tx {
            Some(tx) => {
                tx.locks.insert(id, guard);
                Ok(None)
            }
            None => Ok(Some(guard)),
        }
    }

    /// Write an account row (or a deletion) through this handle.
    fn write_account(
        tx: &mut Option<TxState>,
        tables: &mut Tables,
        id: i64,
        account: Option<Account>,
    ) {
        match tx {
            Some(tx) => {
                tx.accounts.insert(id, account);
            }
            None => match account {
                Some(account) => {
                    tables.accounts.insert(id, account);
                }
                None => {
                    tables.accounts.remove(&id);
                }
            },
        }
    }

    fn ensure_account_exists(&self, tables: &Tables, id: i64) -> StoreResult<()> {
        match self.visible_account(tables, id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    fn check_fault(&self, operation: &'static str) -> StoreResult<()> {
        self.shared.check_fault(operation)?;
        Ok(())
    }
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.into_iter().skip(offset).take(limit).collect()
}

/// Column default for `users.password_changed_at`.
fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl TxHandle for MemQueries {
    async fn commit(mut self) -> StoreResult<()> {
        self.check_fault("commit")?;
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        let mut tables = self.shared.tables()?;
        for (id, account) in tx.accounts {
            match account {
                Some(account) => {
                    tables.accounts.insert(id, account);
                }
                None => {
                    tables.accounts.remove(&id);
                }
            }
        }
        for entry in tx.entries {
            tables.entries.insert(entry.id, entry);
        }
        for transfer in tx.transfers {
            tables.transfers.insert(transfer.id, transfer);
        }
        for user in tx.users {
            tables.users.insert(user.username.clone(), user);
        }
        // Row locks in `tx.locks` are released when `tx` drops here, after
        // the writes are in place.
        Ok(())
    }

    async fn rollback(mut self) -> StoreResult<()> {
        // Writes and locks go away whatever happens next.
        drop(self.tx.take());
        if self.shared.take_rollback_fault()? {
            return Err(MemoryError::InjectedFault("rollback").into());
        }
        Ok(())
    }
}

#[async_trait]
impl Queries for MemQueries {
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account> {
        self.check_fault("create_account")?;
        let mut tables = self.shared.tables()?;
        if !self.visible_user_exists(&tables, &arg.owner) {
            return Err(StoreError::NotFound);
        }

        let account = Account {
            id: tables.next_account_id(),
            owner: arg.owner,
            balance: arg.balance,
            currency: arg.currency,
            created_at: Utc::now(),
        };
        Self::write_account(&mut self.tx, &mut tables, account.id, Some(account.clone()));
        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> StoreResult<Account> {
        self.check_fault("get_account")?;
        let tables = self.shared.tables()?;
        self.visible_account(&tables, id).ok_or(StoreError::NotFound)
    }

    async fn list_accounts(&mut self, arg: ListAccountsParams) -> StoreResult<Vec<Account>> {
        self.check_fault("list_accounts")?;
        let tables = self.shared.tables()?;
        let owned = self
            .visible_accounts(&tables)
            .into_iter()
            .filter(|account| account.owner == arg.owner)
            .collect();
        Ok(page(owned, arg.limit, arg.offset))
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account> {
        self.check_fault("update_account")?;
        let _autocommit_guard = self.lock_account(arg.id).await?;

        let mut tables = self.shared.tables()?;
        let mut account = self
            .visible_account(&tables, arg.id)
            .ok_or(StoreError::NotFound)?;
        account.balance = arg.balance;
        Self::write_account(&mut self.tx, &mut tables, arg.id, Some(account.clone()));
        Ok(account)
    }

    async fn delete_account(&mut self, id: i64) -> StoreResult<()> {
        self.check_fault("delete_account")?;
        let _autocommit_guard = self.lock_account(id).await?;

        let mut tables = self.shared.tables()?;
        self.ensure_account_exists(&tables, id)?;
        let referenced = self
            .visible_entries(&tables)
            .iter()
            .any(|entry| entry.account_id == id)
            || self
                .visible_transfers(&tables)
                .iter()
                .any(|transfer| transfer.from_account_id == id || transfer.to_account_id == id);
        if referenced {
            return Err(MemoryError::StillReferenced(id).into());
        }

        Self::write_account(&mut self.tx, &mut tables, id, None);
        Ok(())
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry> {
        self.check_fault("create_entry")?;
        let mut tables = self.shared.tables()?;
        self.ensure_account_exists(&tables, arg.account_id)?;

        let entry = Entry {
            id: tables.next_entry_id(),
            account_id: arg.account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        match &mut self.tx {
            Some(tx) => tx.entries.push(entry.clone()),
            None => {
                tables.entries.insert(entry.id, entry.clone());
            }
        }
        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry> {
        self.check_fault("get_entry")?;
        let tables = self.shared.tables()?;
        self.visible_entries(&tables)
            .into_iter()
            .find(|entry| entry.id == id)
            .ok_or(StoreError::NotFound)
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> StoreResult<Vec<Entry>> {
        self.check_fault("list_entries")?;
        let tables = self.shared.tables()?;
        let mut entries: Vec<Entry> = self
            .visible_entries(&tables)
            .into_iter()
            .filter(|entry| entry.account_id == arg.account_id)
            .collect();
        entries.sort_by_key(|entry| entry.id);
        Ok(page(entries, arg.limit, arg.offset))
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer> {
        self.check_fault("create_transfer")?;
        let mut tables = self.shared.tables()?;
        self.ensure_account_exists(&tables, arg.from_account_id)?;
        self.ensure_account_exists(&tables, arg.to_account_id)?;

        let transfer = Transfer {
            id: tables.next_transfer_id(),
            from_account_id: arg.from_account_id,
            to_account_id: arg.to_account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        match &mut self.tx {
            Some(tx) => tx.transfers.push(transfer.clone()),
            None => {
                tables.transfers.insert(transfer.id, transfer.clone());
            }
        }
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer> {
        self.check_fault("get_transfer")?;
        let tables = self.shared.tables()?;
        self.visible_transfers(&tables)
            .into_iter()
            .find(|transfer| transfer.id == id)
            .ok_or(StoreError::NotFound)
    }

    async fn list_transfers(&mut self, arg: ListTransfersParams) -> StoreResult<Vec<Transfer>> {
        self.check_fault("list_transfers")?;
        let tables = self.shared.tables()?;
        let mut transfers: Vec<Transfer> = self
            .visible_transfers(&tables)
            .into_iter()
            .filter(|transfer| {
                transfer.from_account_id == arg.from_account_id
                    || transfer.to_account_id == arg.to_account_id
            })
            .collect();
        transfers.sort_by_key(|transfer| transfer.id);
        Ok(page(transfers, arg.limit, arg.offset))
    }

    async fn create_user(&mut self, arg: CreateUserParams) -> StoreResult<User> {
        self.check_fault("create_user")?;
        let mut tables = self.shared.tables()?;
        if self.visible_user_exists(&tables, &arg.username) {
            return Err(MemoryError::UniqueViolation("users.username").into());
        }
        let email_taken = tables.users.values().any(|user| user.email == arg.email)
            || self
                .tx
                .as_ref()
                .is_some_and(|tx| tx.users.iter().any(|user| user.email == arg.email));
        if email_taken {
            return Err(MemoryError::UniqueViolation("users.email").into());
        }

        let user = User {
            username: arg.username,
            hashed_password: arg.hashed_password,
            full_name: arg.full_name,
            email: arg.email,
            password_changed_at: zero_time(),
            created_at: Utc::now(),
        };
        match &mut self.tx {
            Some(tx) => tx.users.push(user.clone()),
            None => {
                tables.users.insert(user.username.clone(), user.clone());
            }
        }
        Ok(user)
    }

    async fn get_user(&mut self, username: &str) -> StoreResult<User> {
        self.check_fault("get_user")?;
        let tables = self.shared.tables()?;
        if let Some(user) = tables.users.get(username) {
            return Ok(user.clone());
        }
        self.tx
            .as_ref()
            .and_then(|tx| tx.users.iter().find(|user| user.username == username))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl BalanceUpdater for MemQueries {
    async fn add_account_balance(&mut self, arg: AddAccountBalanceParams) -> StoreResult<Account> {
        self.check_fault("add_account_balance")?;
        let _autocommit_guard = self.lock_account(arg.id).await?;

        // The row lock is held, so the value read here cannot change before the write.
        let mut tables = self.shared.tables()?;
        let mut account = self
            .visible_account(&tables, arg.id)
            .ok_or(StoreError::NotFound)?;
        account.balance = account
            .balance
            .checked_add(arg.amount)
            .ok_or(MemoryError::BalanceOverflow(arg.id))?;
        Self::write_account(&mut self.tx, &mut tables, arg.id, Some(account.clone()));
        Ok(account)
    }
}
