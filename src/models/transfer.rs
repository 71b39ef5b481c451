//! Transfer data models and API request/response types.
//!
//! This module defines:
//! - `Transfer`: Database entity recording a movement between two accounts
//! - `TransferTxParams` / `TransferTxResult`: input and output of the transfer engine
//! - `TransferRequest`: Request body for `POST /transfer`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{account::Account, entry::Entry};

/// Represents a transfer record from the database.
///
/// # Database Table
///
/// Maps to the `transfers` table. Both account ids are foreign keys into
/// `accounts`. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,

    /// Amount moved, always positive (enforced by CHECK constraint)
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// Arguments for `Queries::create_transfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Arguments for `Queries::list_transfers`.
///
/// Matches transfers where either side is one of the given accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTransfersParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Input of `transfer_service::transfer_tx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

/// Everything a successful transfer created or touched.
///
/// # JSON Example
///
/// ```json
/// {
///   "transfer": { "id": 7, "from_account_id": 1, "to_account_id": 2, "amount": 30, "created_at": "..." },
///   "from_account": { "id": 1, "owner": "alice", "balance": 70, "currency": "USD", "created_at": "..." },
///   "to_account": { "id": 2, "owner": "bob", "balance": 80, "currency": "USD", "created_at": "..." },
///   "from_entry": { "id": 13, "account_id": 1, "amount": -30, "created_at": "..." },
///   "to_entry": { "id": 14, "account_id": 2, "amount": 30, "created_at": "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Request to transfer money between accounts.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": 1,
///   "to_account_id": 2,
///   "amount": 2500,
///   "currency": "USD"
/// }
/// ```
///
/// # Validation
///
/// - Both ids must be >= 1 and different
/// - Amount must be positive
/// - Currency must be supported and match both accounts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
    pub currency: String,
}
