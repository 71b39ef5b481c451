//! Account data models and store parameter types.
//!
//! This module defines:
//! - `Account`: Database entity representing an account
//! - Parameter structs for the account store operations
//! - `CreateAccountRequest`: Request body for creating accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. Each account:
/// - Belongs to one user (via `owner`)
/// - Has a balance stored in minor currency units (to avoid floating-point errors)
///
/// # Balance Storage
///
/// Balances are stored as `i64` minor units. For example:
/// - $10.50 is stored as 1050
/// - $100.00 is stored as 10000
///
/// During a transfer the balance is only ever changed through
/// `BalanceUpdater::add_account_balance`, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier, assigned by the `accounts_id_seq` sequence
    pub id: i64,

    /// Username of the user that owns this account
    pub owner: String,

    /// Current balance in minor units
    ///
    /// Signed: no CHECK constraint keeps it non-negative, see `OverdraftPolicy`.
    pub balance: i64,

    /// Currency code, immutable after creation
    ///
    /// Examples: "USD", "EUR", "RMB"
    pub currency: String,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,
}

/// Arguments for `Queries::create_account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

/// Arguments for `Queries::list_accounts`.
///
/// Accounts are returned in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAccountsParams {
    pub owner: String,
    pub limit: i64,
    pub offset: i64,
}

/// Arguments for `Queries::update_account`.
///
/// Overwrites the balance wholesale. Transfers never use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAccountParams {
    pub id: i64,
    pub balance: i64,
}

/// Arguments for `BalanceUpdater::add_account_balance`.
///
/// `amount` is a signed delta applied as `balance = balance + amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddAccountBalanceParams {
    pub id: i64,
    pub amount: i64,
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "currency": "USD"
/// }
/// ```
///
/// The owner is always the authenticated user and the balance starts at 0.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Currency code, must be one of the supported currencies
    pub currency: String,
}

/// Request body for `PUT /accounts`.
///
/// Overwrites the balance of an account owned by the caller.
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateAccountRequest {
    pub id: i64,
    pub balance: i64,
}

/// Query string for listing the caller's accounts.
///
/// `GET /accounts?limit=10&offset=0`
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

/// Default page size when `limit` is not provided.
fn default_limit() -> i64 {
    10
}
