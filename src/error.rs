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

/// Application-wide error type.
///
/// Every rejection the validation engine or registration workflow can produce
/// maps to exactly one variant here, and every variant maps to one HTTP
/// status code. The validation engine itself returns decision values rather
/// than errors; the workflow converts non-`Valid` decisions into these
/// variants at its boundary.
///
/// # Error Categories
///
/// - **Input Errors**: missing credential header or malformed request body
/// - **Key Errors**: unknown, revoked, or expired API keys
/// - **Quota Errors**: key at/over its installation ceiling
/// - **Resource Errors**: heartbeat/deactivate for a device never registered
/// - **Storage Errors**: any `sqlx::Error` from the database layer
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No `X-API-Key` header was supplied.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("API key not provided")]
    MissingApiKey,

    /// Token has no matching key record.
    ///
    /// Returns HTTP 401 Unauthorized. The message is deliberately generic:
    /// it must not reveal whether similar tokens exist.
    #[error("Invalid API key")]
    KeyNotFound,

    /// Key exists but has been revoked (`is_active = false`).
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("API key revoked")]
    KeyRevoked,

    /// Key is past its expiry timestamp.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("API key expired")]
    KeyExpired,

    /// Key has consumed its full installation quota.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Installation limit reached")]
    QuotaExceeded,

    /// Heartbeat or deactivate for a (key, device) pair never registered.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Installation not found")]
    InstallationNotFound,

    /// Requested admin resource (key id, client id) does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Resource not found")]
    NotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// Short machine-readable code used in the JSON error envelope and in
    /// the validation audit log.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "internal_error",
            AppError::MissingApiKey => "missing_api_key",
            AppError::KeyNotFound => "key_not_found",
            AppError::KeyRevoked => "key_revoked",
            AppError::KeyExpired => "key_expired",
            AppError::QuotaExceeded => "quota_exceeded",
            AppError::InstallationNotFound => "installation_not_found",
            AppError::NotFound => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
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
/// - `MissingApiKey`, `KeyNotFound` → 401 Unauthorized
/// - `KeyRevoked`, `KeyExpired` → 403 Forbidden
/// - `QuotaExceeded` → 429 Too Many Requests
/// - `InstallationNotFound`, `NotFound` → 404 Not Found
/// - `InvalidRequest` → 400 Bad Request
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, message) = match self {
            AppError::MissingApiKey | AppError::KeyNotFound => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::KeyRevoked | AppError::KeyExpired => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::InstallationNotFound | AppError::NotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };
        let code = self.code();

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn rejection_status_codes() {
        assert_eq!(status_of(AppError::MissingApiKey), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::KeyNotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::KeyRevoked), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AppError::KeyExpired), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(AppError::QuotaExceeded),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(AppError::InstallationNotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::InvalidRequest("missing device_id".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn key_not_found_message_is_generic() {
        // The 401 body must not distinguish "no such token" from other
        // credential failures.
        assert_eq!(AppError::KeyNotFound.to_string(), "Invalid API key");
    }
}
