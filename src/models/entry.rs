//! Ledger entry model.
//!
//! An entry is one leg of a double-entry posting. Every applied transfer
//! writes exactly two of them, one per account, with opposite amounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an entry record from the database.
///
/// # Database Table
///
/// Maps to the `entries` table. Rows are append-only: created once as part
/// of a transfer and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,

    /// Account whose balance this entry moved
    pub account_id: i64,

    /// Signed delta: negative for the debited side, positive for the credited side
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// Arguments for `Queries::create_entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateEntryParams {
    pub account_id: i64,
    pub amount: i64,
}

/// Arguments for `Queries::list_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntriesParams {
    pub account_id: i64,
    pub limit: i64,
    pub offset: i64,
}
