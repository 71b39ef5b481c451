//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the parameter structs taken by the store operations.

/// Account model
pub mod account;
/// Ledger entry model
pub mod entry;
/// Transfer model and transfer engine input/output
pub mod transfer;
/// User model
pub mod user;

pub use account::{
    Account, AddAccountBalanceParams, CreateAccountParams, ListAccountsParams, UpdateAccountParams,
    UpdateAccountRequest,
};
pub use entry::{CreateEntryParams, Entry, ListEntriesParams};
pub use transfer::{
    CreateTransferParams, ListTransfersParams, Transfer, TransferRequest, TransferTxParams,
    TransferTxResult,
};
pub use user::{CreateUserParams, User};
