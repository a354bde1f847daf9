//! Installation model and device-facing request/response types.
//!
//! An installation is one device's registered activation against a specific
//! API key. The (api_key_id, device_id) pair is unique: re-registering from
//! the same device updates the existing row instead of consuming another
//! quota slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an installation record from the database.
///
/// # Database Table
///
/// Maps to the `installations` table with a compound unique constraint on
/// (`api_key_id`, `device_id`).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Installation {
    /// Unique identifier for this installation
    pub id: Uuid,

    /// Owning API key
    pub api_key_id: Uuid,

    /// Client-supplied stable device identifier
    pub device_id: String,

    /// Free-form device attributes (OS, version, architecture, ...),
    /// overwritten on every re-registration
    pub device_info: serde_json::Value,

    /// Last-seen network origin, overwritten on each contact
    pub ip_address: String,

    /// False once the device explicitly deactivates; the row is never deleted
    pub is_active: bool,

    /// Last registration or heartbeat call from this device
    pub last_heartbeat: DateTime<Utc>,

    /// Timestamp of the first successful registration
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/validate`.
///
/// The API key itself travels in the `X-API-Key` header, never in the body.
///
/// # JSON Example
///
/// ```json
/// {
///   "device_id": "a1b2c3d4",
///   "device_info": { "os": "linux", "version": "1.4.2", "arch": "x86_64" },
///   "ip_address": "203.0.113.7"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Stable device identifier; required
    pub device_id: String,

    /// Free-form device attributes
    #[serde(default)]
    pub device_info: serde_json::Value,

    /// Reported origin address; falls back to "unknown" when absent
    pub ip_address: Option<String>,

    /// Client software identifier (e.g. "Docker/24.0.2"); recorded on the
    /// validation audit trail when present
    pub user_agent: Option<String>,
}

/// Request body for heartbeat and deactivate calls — device id only.
#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub device_id: String,
}

/// Response body for a successful validation/registration.
///
/// `installations_left` is the remaining quota *after* this registration,
/// so a key at 4 of 5 slots answers a new device with 0.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub installations_left: Option<i32>,
}

/// Generic acknowledgement body for heartbeat/deactivate calls.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_request_accepts_user_agent() {
        let request: ValidateRequest = serde_json::from_str(
            r#"{
                "device_id": "dev-A",
                "device_info": {"os": "linux"},
                "ip_address": "203.0.113.7",
                "user_agent": "Docker/24.0.2"
            }"#,
        )
        .unwrap();

        assert_eq!(request.user_agent.as_deref(), Some("Docker/24.0.2"));
    }

    #[test]
    fn validate_request_needs_only_device_id() {
        // Older clients send nothing but the device identifier.
        let request: ValidateRequest = serde_json::from_str(r#"{"device_id": "dev-A"}"#).unwrap();

        assert_eq!(request.device_id, "dev-A");
        assert!(request.device_info.is_null());
        assert!(request.ip_address.is_none());
        assert!(request.user_agent.is_none());
    }
}
