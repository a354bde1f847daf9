//! Key management — issuing, listing, and revoking API keys.
//!
//! Key creation is an admin action; devices never mint their own tokens.

use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::{ApiKey, CreateKeyRequest, UpdateKeyRequest},
        client::{Client, CreateClientRequest, UpdateClientRequest},
        installation::Installation,
    },
};

/// Token prefix identifying credentials issued by this service.
const TOKEN_PREFIX: &str = "ak_";

/// Random alphanumeric characters following the prefix; total length 32.
const TOKEN_RANDOM_LEN: usize = 28;

/// Generate a fresh opaque token: `ak_` plus 28 random alphanumerics.
///
/// Tokens are not hashed or signed; they are secrets matched verbatim.
/// Uniqueness is enforced by the `api_keys.token` unique constraint.
pub fn generate_token() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{TOKEN_PREFIX}{random}")
}

/// Reject a quota that could never admit a device.
fn ensure_valid_quota(max_installations: i32) -> Result<(), AppError> {
    if max_installations < 1 {
        return Err(AppError::InvalidRequest(
            "max_installations must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Reject a client status outside the known set.
fn ensure_known_status(status: &str) -> Result<(), AppError> {
    if !matches!(status, "active" | "suspended" | "blocked") {
        return Err(AppError::InvalidRequest(
            "status must be one of active, suspended, blocked".to_string(),
        ));
    }
    Ok(())
}

/// Issue a new API key.
///
/// # Errors
///
/// - `InvalidRequest` if `max_installations` is below 1
/// - `Database` on storage failure (including the astronomically unlikely
///   token collision, surfaced as a unique-constraint violation)
pub async fn create_key(pool: &DbPool, request: CreateKeyRequest) -> Result<ApiKey, AppError> {
    ensure_valid_quota(request.max_installations)?;

    let token = generate_token();

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (
            token,
            client_id,
            client_name,
            client_email,
            max_installations,
            expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&token)
    .bind(request.client_id)
    .bind(&request.client_name)
    .bind(&request.client_email)
    .bind(request.max_installations)
    .bind(request.expires_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(key_id = %key.id, client = %key.client_name, "API key issued");

    Ok(key)
}

/// List all keys, newest first.
pub async fn list_keys(pool: &DbPool) -> Result<Vec<ApiKey>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(keys)
}

/// Amend an existing key.
///
/// Only the fields present in the request change; the token, counters, and
/// active flag are untouchable through this path. Raising
/// `max_installations` is how an admin grants a key more slots; lowering it
/// below the consumed count just blocks new devices.
///
/// # Errors
///
/// - `InvalidRequest` if the new quota is below 1
/// - `NotFound` if no key has this id
pub async fn update_key(
    pool: &DbPool,
    key_id: Uuid,
    request: UpdateKeyRequest,
) -> Result<ApiKey, AppError> {
    if let Some(max) = request.max_installations {
        ensure_valid_quota(max)?;
    }

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        UPDATE api_keys
        SET max_installations = COALESCE($1, max_installations),
            expires_at = COALESCE($2, expires_at),
            client_name = COALESCE($3, client_name),
            client_email = COALESCE($4, client_email)
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(request.max_installations)
    .bind(request.expires_at)
    .bind(&request.client_name)
    .bind(&request.client_email)
    .bind(key_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    tracing::info!(%key_id, max_installations = key.max_installations, "API key updated");

    Ok(key)
}

/// Revoke a key by id. Soft state change only; the record stays for audit.
pub async fn revoke_key(pool: &DbPool, key_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE id = $1")
        .bind(key_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(%key_id, "API key revoked");

    Ok(())
}

/// List all installations, newest first.
pub async fn list_installations(pool: &DbPool) -> Result<Vec<Installation>, AppError> {
    let installations =
        sqlx::query_as::<_, Installation>("SELECT * FROM installations ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    Ok(installations)
}

/// Register a new client.
pub async fn create_client(
    pool: &DbPool,
    request: CreateClientRequest,
) -> Result<Client, AppError> {
    ensure_known_status(&request.status)?;

    let client = sqlx::query_as::<_, Client>(
        r#"
        INSERT INTO clients (name, email, company, phone, notes, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.email)
    .bind(&request.company)
    .bind(&request.phone)
    .bind(&request.notes)
    .bind(&request.status)
    .fetch_one(pool)
    .await?;

    Ok(client)
}

/// Amend a client record. Only fields present in the request change.
///
/// # Errors
///
/// - `InvalidRequest` if the new status is outside the known set
/// - `NotFound` if no client has this id
pub async fn update_client(
    pool: &DbPool,
    client_id: Uuid,
    request: UpdateClientRequest,
) -> Result<Client, AppError> {
    if let Some(ref status) = request.status {
        ensure_known_status(status)?;
    }

    let client = sqlx::query_as::<_, Client>(
        r#"
        UPDATE clients
        SET name = COALESCE($1, name),
            email = COALESCE($2, email),
            company = COALESCE($3, company),
            phone = COALESCE($4, phone),
            notes = COALESCE($5, notes),
            status = COALESCE($6, status)
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.email)
    .bind(&request.company)
    .bind(&request.phone)
    .bind(&request.notes)
    .bind(&request.status)
    .bind(client_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(client)
}

/// List all clients, newest first.
pub async fn list_clients(pool: &DbPool) -> Result<Vec<Client>, AppError> {
    let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_prefix_and_fixed_length() {
        let token = generate_token();
        assert!(token.starts_with("ak_"));
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn token_body_is_alphanumeric() {
        let token = generate_token();
        assert!(token[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_are_unique_in_practice() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn quota_below_one_is_rejected() {
        assert!(ensure_valid_quota(1).is_ok());
        assert!(matches!(
            ensure_valid_quota(0),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            ensure_valid_quota(-3),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_client_status_is_rejected() {
        assert!(ensure_known_status("active").is_ok());
        assert!(ensure_known_status("suspended").is_ok());
        assert!(ensure_known_status("blocked").is_ok());
        assert!(matches!(
            ensure_known_status("paused"),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
