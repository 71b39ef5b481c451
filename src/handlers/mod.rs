//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Validates it and checks ownership against the token payload
//! 3. Calls the store or the transfer service
//! 4. Returns HTTP response (JSON, status code)

/// Account management endpoints
pub mod accounts;
/// Service health endpoint
pub mod health;
/// Money transfer endpoint
pub mod transfers;

#[cfg(test)]
pub(crate) mod test_support;
