//! Admin endpoints: key issuance and listings.
//!
//! Operator authentication is handled by a fronting layer and is out of
//! scope here; these handlers assume a trusted caller.
//!
//! - POST /api/v1/admin/keys - issue a new API key
//! - GET /api/v1/admin/keys - list keys
//! - PATCH /api/v1/admin/keys/{id} - amend a key (quota, expiry, owner)
//! - POST /api/v1/admin/keys/{id}/revoke - revoke a key
//! - GET /api/v1/admin/installations - list installations
//! - POST /api/v1/admin/clients - register a client
//! - PATCH /api/v1/admin/clients/{id} - amend a client
//! - GET /api/v1/admin/clients - list clients

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::{ApiKey, CreateKeyRequest, UpdateKeyRequest},
        client::{Client, CreateClientRequest, UpdateClientRequest},
        installation::{Installation, MessageResponse},
    },
    services::key_service,
};

/// Issue a new API key.
///
/// # Endpoint
///
/// `POST /api/v1/admin/keys`
///
/// # Response (201 Created)
///
/// The full key record, including the freshly generated token. This is the
/// only moment the token is intentionally handed out; clients are expected
/// to store it.
pub async fn create_key(
    State(pool): State<DbPool>,
    Json(request): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<ApiKey>), AppError> {
    let key = key_service::create_key(&pool, request).await?;

    Ok((StatusCode::CREATED, Json(key)))
}

/// List all keys, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/admin/keys`
pub async fn list_keys(State(pool): State<DbPool>) -> Result<Json<Vec<ApiKey>>, AppError> {
    let keys = key_service::list_keys(&pool).await?;

    Ok(Json(keys))
}

/// Amend an existing key.
///
/// # Endpoint
///
/// `PATCH /api/v1/admin/keys/{id}`
///
/// The usual admin action here is raising `max_installations` for a client
/// that outgrew its quota; owner contact fields and expiry can move too.
/// Absent fields are left unchanged.
pub async fn update_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<Uuid>,
    Json(request): Json<UpdateKeyRequest>,
) -> Result<Json<ApiKey>, AppError> {
    let key = key_service::update_key(&pool, key_id, request).await?;

    Ok(Json(key))
}

/// Revoke a key by id.
///
/// # Endpoint
///
/// `POST /api/v1/admin/keys/{id}/revoke`
///
/// Revocation is a soft state change; the record and its installations stay
/// for audit. There is no reactivation endpoint.
pub async fn revoke_key(
    State(pool): State<DbPool>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    key_service::revoke_key(&pool, key_id).await?;

    Ok(Json(MessageResponse {
        message: "API key revoked".to_string(),
    }))
}

/// List all installations, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/admin/installations`
pub async fn list_installations(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<Installation>>, AppError> {
    let installations = key_service::list_installations(&pool).await?;

    Ok(Json(installations))
}

/// Register a new client.
///
/// # Endpoint
///
/// `POST /api/v1/admin/clients`
pub async fn create_client(
    State(pool): State<DbPool>,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = key_service::create_client(&pool, request).await?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// Amend a client record.
///
/// # Endpoint
///
/// `PATCH /api/v1/admin/clients/{id}`
pub async fn update_client(
    State(pool): State<DbPool>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = key_service::update_client(&pool, client_id, request).await?;

    Ok(Json(client))
}

/// List all clients, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/admin/clients`
pub async fn list_clients(State(pool): State<DbPool>) -> Result<Json<Vec<Client>>, AppError> {
    let clients = key_service::list_clients(&pool).await?;

    Ok(Json(clients))
}
