//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the services layer
//! 3. Returns HTTP response (JSON, status code)

/// Admin endpoints: key issuance, clients, installation listings
pub mod admin;
/// Dashboard aggregate endpoints
pub mod dashboard;
/// Device-facing validation, heartbeat and deactivation endpoints
pub mod device;
/// Health check endpoint
pub mod health;
