//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the transactions that span more than one store operation.

pub mod transfer_service;
