//! Transactional money-transfer engine for a banking backend.
//!
//! - [`store`]: the ledger store (accounts, entries, transfers, users) and the
//!   transactional executor, with PostgreSQL and in-memory backends
//! - [`services::transfer_service`]: the transfer orchestrator
//! - [`router`]: the HTTP surface served by the binary

pub mod config;
pub mod currency;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod random;
pub mod router;
pub mod services;
pub mod store;
pub mod token;

pub use services::transfer_service::{OverdraftPolicy, transfer_tx, transfer_tx_with_policy};
pub use store::{MemoryStore, PgStore, Store, StoreError, StoreResult};
