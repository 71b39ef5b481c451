//! PostgreSQL implementation of the ledger store.
//!
//! All queries live on [`PgQueries`], which is generic over the connection it
//! runs on. `PgQueries<PoolConnection<Postgres>>` autocommits every statement;
//! `PgQueries<Transaction<'static, Postgres>>` runs inside `exec_tx`.

use std::ops::DerefMut;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Postgres, Transaction};

use super::executor::{self, TxHandle};
use super::{BalanceUpdater, Queries, Store, StoreError, StoreResult, TxFuture};
use crate::db::DbPool;
use crate::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, CreateUserParams, Entry, ListAccountsParams, ListEntriesParams,
    ListTransfersParams, Transfer, UpdateAccountParams, User,
};

/// Store backed by a PostgreSQL connection pool.
///
/// Transactions use the server default isolation level (read committed).
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
    tx_timeout: Option<Duration>,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            tx_timeout: None,
        }
    }

    /// Roll back any transaction still running after `limit`.
    pub fn with_tx_timeout(mut self, limit: Option<Duration>) -> Self {
        self.tx_timeout = limit;
        self
    }
}

#[async_trait]
impl Store for PgStore {
    type Conn = PgQueries<PoolConnection<Postgres>>;
    type Tx = PgQueries<Transaction<'static, Postgres>>;

    async fn conn(&self) -> StoreResult<Self::Conn> {
        let conn = self.pool.acquire().await?;
        Ok(PgQueries::new(conn))
    }

    async fn exec_tx<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> TxFuture<'t, T> + Send + 'static,
    {
        let tx = self.pool.begin().await?;
        executor::run(PgQueries::new(tx), self.tx_timeout, f).await
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Query handle over any PostgreSQL connection.
#[derive(Debug)]
pub struct PgQueries<C> {
    conn: C,
}

impl<C> PgQueries<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl TxHandle for PgQueries<Transaction<'static, Postgres>> {
    async fn commit(self) -> StoreResult<()> {
        self.conn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.conn.rollback().await.map_err(StoreError::data_access)
    }
}

#[async_trait]
impl<C> Queries for PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create_account(&mut self, arg: CreateAccountParams) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (owner, balance, currency)
            VALUES ($1, $2, $3)
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(arg.owner)
        .bind(arg.balance)
        .bind(arg.currency)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, owner, balance, currency, created_at FROM accounts WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }

    async fn list_accounts(&mut self, arg: ListAccountsParams) -> StoreResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner, balance, currency, created_at
            FROM accounts
            WHERE owner = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(arg.owner)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(accounts)
    }

    async fn update_account(&mut self, arg: UpdateAccountParams) -> StoreResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = $2
            WHERE id = $1
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(arg.id)
        .bind(arg.balance)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }

    async fn delete_account(&mut self, id: i64) -> StoreResult<()> {
        // A foreign-key violation here means ledger rows still reference the
        // account, not that the account is missing.
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(StoreError::data_access)?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> StoreResult<Entry> {
        let entry = sqlx::query_as::<_, Entry>(
            r#"
            INSERT INTO entries (account_id, amount)
            VALUES ($1, $2)
            RETURNING id, account_id, amount, created_at
            "#,
        )
        .bind(arg.account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> StoreResult<Entry> {
        let entry = sqlx::query_as::<_, Entry>(
            "SELECT id, account_id, amount, created_at FROM entries WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(entry)
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> StoreResult<Vec<Entry>> {
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, account_id, amount, created_at
            FROM entries
            WHERE account_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(arg.account_id)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(entries)
    }

    async fn create_transfer(&mut self, arg: CreateTransferParams) -> StoreResult<Transfer> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(arg.from_account_id)
        .bind(arg.to_account_id)
        .bind(arg.amount)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> StoreResult<Transfer> {
        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(transfer)
    }

    async fn list_transfers(&mut self, arg: ListTransfersParams) -> StoreResult<Vec<Transfer>> {
        let transfers = sqlx::query_as::<_, Transfer>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, created_at
            FROM transfers
            WHERE from_account_id = $1 OR to_account_id = $2
            ORDER BY id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(arg.from_account_id)
        .bind(arg.to_account_id)
        .bind(arg.limit)
        .bind(arg.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(transfers)
    }

    async fn create_user(&mut self, arg: CreateUserParams) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, hashed_password, full_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING username, hashed_password, full_name, email, password_changed_at, created_at
            "#,
        )
        .bind(arg.username)
        .bind(arg.hashed_password)
        .bind(arg.full_name)
        .bind(arg.email)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(user)
    }

    async fn get_user(&mut self, username: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT username, hashed_password, full_name, email, password_changed_at, created_at
            FROM users
            WHERE username = $1
            LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl<C> BalanceUpdater for PgQueries<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn add_account_balance(&mut self, arg: AddAccountBalanceParams) -> StoreResult<Account> {
        // Single statement: the row lock is taken and the delta applied together.
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance + $1
            WHERE id = $2
            RETURNING id, owner, balance, currency, created_at
            "#,
        )
        .bind(arg.amount)
        .bind(arg.id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(account)
    }
}
