//! API key model and admin request types.
//!
//! An API key is the credential a piece of client software presents when it
//! registers an installation. Tokens are opaque random strings (`ak_` prefix
//! plus 28 alphanumeric characters) stored verbatim and matched exactly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table.
///
/// # Quota Accounting
///
/// `current_installations` counts quota slots *consumed over the key's
/// lifetime*, not currently-active devices. Deactivating an installation does
/// not decrement it, so a freed slot cannot be recycled without admin
/// intervention. The ceiling is enforced at validation time, not by the
/// database, so the counter may legitimately sit at `max_installations` while
/// registered devices keep heartbeating.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ApiKey {
    /// Unique identifier for this key
    pub id: Uuid,

    /// The secret token presented by devices (32 chars, globally unique)
    pub token: String,

    /// Loose reference to the owning client (may not exist in `clients`)
    pub client_id: Option<Uuid>,

    /// Denormalized owner name, shown in admin listings
    pub client_name: String,

    /// Denormalized owner email
    pub client_email: String,

    /// Ceiling on cumulative device registrations for this key
    pub max_installations: i32,

    /// Quota slots consumed so far (never decremented within this service)
    pub current_installations: i32,

    /// False once revoked; revocation is permanent short of explicit
    /// admin reactivation, which this service does not expose
    pub is_active: bool,

    /// Timestamp when this key was issued
    pub created_at: DateTime<Utc>,

    /// Optional expiry; `None` means the key never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Last successful validation or heartbeat, if any
    pub last_used: Option<DateTime<Utc>>,
}

/// Request body for creating a new API key (admin endpoint).
///
/// # JSON Example
///
/// ```json
/// {
///   "client_name": "TechCorp Ltd",
///   "client_email": "admin@techcorp.com",
///   "max_installations": 50,
///   "expires_at": "2026-12-31T00:00:00Z"
/// }
/// ```
///
/// # Validation
///
/// - `max_installations`: must be at least 1
/// - `expires_at`: optional; omit for a key that never expires
#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    /// Optional reference to an existing client record
    pub client_id: Option<Uuid>,

    /// Owner display name
    pub client_name: String,

    /// Owner contact email
    pub client_email: String,

    /// Installation quota
    pub max_installations: i32,

    /// Optional expiry timestamp
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for amending an existing key (admin endpoint).
///
/// Absent fields are left unchanged. Lowering `max_installations` below the
/// consumed count is allowed: the key simply rejects new devices until the
/// quota is raised again. Expiry can be moved through this endpoint but not
/// cleared.
#[derive(Debug, Deserialize)]
pub struct UpdateKeyRequest {
    /// New installation quota; must be at least 1 when present
    pub max_installations: Option<i32>,

    /// New expiry timestamp
    pub expires_at: Option<DateTime<Utc>>,

    /// Updated owner display name
    pub client_name: Option<String>,

    /// Updated owner contact email
    pub client_email: Option<String>,
}
