//! Client model — the owner/tenant behind one or more API keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a client record from the database.
///
/// Clients own API keys loosely via `api_keys.client_id`; there is no
/// cascading delete and a key may reference a client that no longer exists.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Client {
    /// Unique identifier for this client
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Optional company name
    pub company: Option<String>,

    /// Optional phone number
    pub phone: Option<String>,

    /// Free-form operator notes
    pub notes: Option<String>,

    /// One of `active`, `suspended`, `blocked`
    pub status: String,

    /// Timestamp when the client was registered
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a new client (admin endpoint).
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,

    /// Defaults to `active` if not provided
    #[serde(default = "default_status")]
    pub status: String,
}

/// Default status value when not specified in request.
fn default_status() -> String {
    "active".to_string()
}

/// Request body for amending a client record (admin endpoint).
///
/// Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}
