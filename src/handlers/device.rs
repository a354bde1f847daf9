//! Device-facing API endpoints.
//!
//! These are the routes client software calls with its `X-API-Key` header:
//! - POST /api/v1/validate - validate the key and register this installation
//! - POST /api/v1/heartbeat - liveness ping for a registered installation
//! - POST /api/v1/deactivate - deactivate this installation
//! - POST /api/v1/key/heartbeat - key-level liveness ping
//! - POST /api/v1/key/deactivate - deactivate the key itself (kill switch)

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::ApiKeyToken,
    models::installation::{DeviceRequest, MessageResponse, ValidateRequest, ValidationResponse},
    services::registration_service,
};

/// Origin placeholder when the device does not report an address.
const UNKNOWN_IP: &str = "unknown";

/// Validate the presented key and register (or refresh) an installation.
///
/// # Endpoint
///
/// `POST /api/v1/validate`
///
/// # Request Body
///
/// ```json
/// {
///   "device_id": "a1b2c3d4",
///   "device_info": { "os": "linux", "version": "1.4.2" },
///   "ip_address": "203.0.113.7"
/// }
/// ```
///
/// # Response
///
/// - **Success (200)**: `{ "success": true, "message": "...",
///   "installations_left": 4 }`
/// - **Error (401)**: missing header or unknown key
/// - **Error (403)**: key revoked or expired
/// - **Error (429)**: installation quota exhausted
pub async fn validate(
    State(pool): State<DbPool>,
    Extension(ApiKeyToken(token)): Extension<ApiKeyToken>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidationResponse>, AppError> {
    if request.device_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "device_id must not be empty".to_string(),
        ));
    }

    let ip_address = request.ip_address.as_deref().unwrap_or(UNKNOWN_IP);

    let response = registration_service::validate_and_register(
        &pool,
        &token,
        &request.device_id,
        request.device_info,
        ip_address,
        request.user_agent.as_deref(),
    )
    .await?;

    Ok(Json(response))
}

/// Record a heartbeat from a registered installation.
///
/// # Endpoint
///
/// `POST /api/v1/heartbeat`
///
/// A key over quota or past expiry does not block this call; only a missing
/// or revoked key does.
pub async fn heartbeat(
    State(pool): State<DbPool>,
    Extension(ApiKeyToken(token)): Extension<ApiKeyToken>,
    Json(request): Json<DeviceRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if request.device_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "device_id must not be empty".to_string(),
        ));
    }

    registration_service::heartbeat(&pool, &token, &request.device_id).await?;

    Ok(Json(MessageResponse {
        message: "Installation status updated".to_string(),
    }))
}

/// Deactivate a registered installation.
///
/// # Endpoint
///
/// `POST /api/v1/deactivate`
///
/// Does not free the quota slot the installation consumed.
pub async fn deactivate(
    State(pool): State<DbPool>,
    Extension(ApiKeyToken(token)): Extension<ApiKeyToken>,
    Json(request): Json<DeviceRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if request.device_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "device_id must not be empty".to_string(),
        ));
    }

    registration_service::deactivate_installation(&pool, &token, &request.device_id).await?;

    Ok(Json(MessageResponse {
        message: "Installation deactivated".to_string(),
    }))
}

/// Key-level heartbeat: bump the key's `last_used` timestamp.
///
/// # Endpoint
///
/// `POST /api/v1/key/heartbeat`
pub async fn key_heartbeat(
    State(pool): State<DbPool>,
    Extension(ApiKeyToken(token)): Extension<ApiKeyToken>,
) -> Result<Json<MessageResponse>, AppError> {
    registration_service::key_heartbeat(&pool, &token).await?;

    Ok(Json(MessageResponse {
        message: "API key status updated".to_string(),
    }))
}

/// Key-level kill switch: deactivate the key the caller presented.
///
/// # Endpoint
///
/// `POST /api/v1/key/deactivate`
pub async fn key_deactivate(
    State(pool): State<DbPool>,
    Extension(ApiKeyToken(token)): Extension<ApiKeyToken>,
) -> Result<Json<MessageResponse>, AppError> {
    registration_service::key_deactivate(&pool, &token).await?;

    Ok(Json(MessageResponse {
        message: "API key deactivated".to_string(),
    }))
}
