//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers. They can
//! short-circuit requests (reject unauthorized) or attach data for handlers.

/// Bearer token authentication middleware
pub mod auth;
