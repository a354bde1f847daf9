//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod dashboard_service;
pub mod key_service;
pub mod registration_service;
pub mod validation;
