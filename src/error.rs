//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;
use crate::token::TokenError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Store Errors**: Anything the ledger store or transfer engine returned
/// - **Authentication Errors**: Missing, malformed, or expired tokens, and
///   requests touching accounts the caller does not own
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Store operation failed.
    ///
    /// `NotFound` maps to 404, `InsufficientFunds` to 422, the rest to 500.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Token could not be verified.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Missing credentials, or the caller does not own the resource.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Token`, `Unauthorized` → 401 Unauthorized
/// - `Store(NotFound)` → 404 Not Found
/// - `Store(InsufficientFunds)` → 422 Unprocessable Entity
/// - `InvalidRequest` → 400 Bad Request
/// - any other `Store` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Token(ref err) => {
                (StatusCode::UNAUTHORIZED, "invalid_token", err.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "not_found", "Record not found".to_string())
            }
            AppError::Store(ref err @ StoreError::InsufficientFunds { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                err.to_string(),
            ),
            AppError::Store(err) => {
                tracing::error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
