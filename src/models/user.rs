//! User model.
//!
//! Users are owned by the authentication side of the service. The transfer
//! engine only meets them through `Account::owner`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table, keyed by `username`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub username: String,

    /// Credential hash, never serialized back to clients
    #[serde(skip_serializing, default)]
    pub hashed_password: String,

    pub full_name: String,
    pub email: String,

    /// `0001-01-01T00:00:00Z` until the password is first changed
    pub password_changed_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Arguments for `Queries::create_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserParams {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}
