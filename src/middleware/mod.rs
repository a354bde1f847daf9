//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Extract credentials from requests
//! - Log requests
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)

/// API key extraction middleware
pub mod auth;
