//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the JSON request/response types the API exchanges with clients.

/// API key entity and admin key management types
pub mod api_key;
/// Client (key owner) entity
pub mod client;
/// Dashboard aggregate types
pub mod dashboard;
/// Installation entity and device-facing request/response types
pub mod installation;
