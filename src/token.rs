//! Bearer token creation and verification.
//!
//! Tokens are stateless and signed with HMAC-SHA256:
//!
//! ```text
//! <hex(payload json)>.<hex(hmac-sha256(key, payload json))>
//! ```
//!
//! The payload carries the username and an expiry, so verification needs no
//! database round trip.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Minimum symmetric key length in bytes.
pub const MIN_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid key size: must be at least {MIN_KEY_SIZE} bytes")]
    InvalidKeySize,

    #[error("token is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,
}

/// Claims carried by a token.
///
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Unique token id
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(username: &str, duration: Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expired_at: issued_at + duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expired_at
    }
}

/// Issues and verifies tokens with a symmetric key.
#[derive(Clone)]
pub struct TokenMaker {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMaker").finish_non_exhaustive()
    }
}

impl TokenMaker {
    pub fn new(symmetric_key: &str) -> Result<Self, TokenError> {
        if symmetric_key.len() < MIN_KEY_SIZE {
            return Err(TokenError::InvalidKeySize);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(symmetric_key.as_bytes())
            .map_err(|_| TokenError::InvalidKeySize)?;
        Ok(Self { mac })
    }

    /// Create a token for `username` valid for `duration`.
    pub fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(username, duration);
        let body = serde_json::to_vec(&payload).map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac.clone();
        mac.update(&body);
        let signature = mac.finalize().into_bytes();

        let token = format!("{}.{}", hex::encode(&body), hex::encode(signature));
        Ok((token, payload))
    }

    /// Check the signature and expiry of `token` and return its payload.
    pub fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        let (body_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Invalid)?;
        let body = hex::decode(body_hex).map_err(|_| TokenError::Invalid)?;
        let signature = hex::decode(signature_hex).map_err(|_| TokenError::Invalid)?;

        let mut mac = self.mac.clone();
        mac.update(&body);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let payload: Payload = serde_json::from_slice(&body).map_err(|_| TokenError::Invalid)?;
        if payload.is_expired() {
            return Err(TokenError::Expired);
        }
        Ok(payload)
    }
}
