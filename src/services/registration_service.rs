//! Registration workflow — validation plus store mutation for the
//! device-facing operations.
//!
//! This service owns every write the device API can cause:
//! - validate-and-register (find-or-create an installation, consume quota)
//! - installation heartbeat / deactivate
//! - key heartbeat / deactivate
//!
//! # Atomicity Guarantees
//!
//! All multi-row updates happen within PostgreSQL transactions, so either the
//! installation upsert and the counter increment both apply or neither does.
//!
//! The find-or-create-and-increment sequence for one (api_key, device) pair
//! is serialized by taking `FOR UPDATE` on the key row for the duration of
//! the transaction. Two first-time registrations racing on the same device
//! cannot both observe "not found": the loser blocks until the winner
//! commits, then re-reads and takes the re-registration path. Registrations
//! against different keys never contend. The compound unique constraint on
//! (api_key_id, device_id) backstops the invariant at the storage layer.
//!
//! The per-operation accounting rules (when a slot is consumed, when a key
//! rejection applies) live in [`plan_registration`] and [`admit_heartbeat`]
//! so they stay testable without a database.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::ApiKey,
        installation::{Installation, ValidationResponse},
    },
    services::validation::{self, Decision},
};

/// How an accepted registration maps onto store mutations.
#[derive(Debug, PartialEq, Eq)]
enum RegistrationPlan {
    /// First registration for this device: insert the row and consume one
    /// quota slot.
    Create { installations_left: i32 },

    /// The device already holds a row: refresh it in place. The slot was
    /// consumed when the row was first created, so the counter stays put.
    Refresh { installations_left: i32 },
}

/// Decide how to apply an accepted registration.
///
/// `decided_left` is the engine's remaining-quota figure, which assumes the
/// call consumes a slot; a re-registration does not, so the refresh path
/// reports `max - current` instead.
fn plan_registration(key: &ApiKey, already_registered: bool, decided_left: i32) -> RegistrationPlan {
    if already_registered {
        RegistrationPlan::Refresh {
            installations_left: key.max_installations - key.current_installations,
        }
    } else {
        RegistrationPlan::Create {
            installations_left: decided_left,
        }
    }
}

/// Admission rule for heartbeats: only revocation blocks.
///
/// A key at/over quota, or past expiry, must still accept heartbeats from
/// devices that registered while it was healthy — otherwise other devices
/// filling the key up would lock registered installations out mid-cycle.
fn admit_heartbeat(key: &ApiKey) -> Result<(), AppError> {
    if !key.is_active {
        return Err(AppError::KeyRevoked);
    }
    Ok(())
}

/// Validate a presented token and register (or refresh) an installation.
///
/// # Process
///
/// 1. Start a database transaction and lock the key row (`FOR UPDATE`)
/// 2. Run the validation decision over the locked snapshot
/// 3. On rejection: abort, record a failed validation event, return the error
/// 4. On acceptance: apply the [`RegistrationPlan`] for (key, device)
/// 5. Record a successful validation event and commit
///
/// # Idempotent Re-registration
///
/// A device that re-validates does not consume a second quota slot: for a
/// fixed (key, device) pair the counter is incremented at most once across
/// the installation row's lifetime.
///
/// # Errors
///
/// - `KeyNotFound`, `KeyRevoked`, `QuotaExceeded`, `KeyExpired`: rejections
///   from the validation engine, in that precedence order
/// - `Database`: transaction failed; no partial state remains
pub async fn validate_and_register(
    pool: &DbPool,
    token: &str,
    device_id: &str,
    device_info: serde_json::Value,
    ip_address: &str,
    user_agent: Option<&str>,
) -> Result<ValidationResponse, AppError> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    // Lock the key row so concurrent registrations on this key serialize.
    let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE token = $1 FOR UPDATE")
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

    let decision = validation::decide(key.as_ref(), now);

    let Decision::Valid { installations_left } = decision else {
        // Rejected: nothing in the transaction may survive.
        tx.rollback().await?;
        record_event(
            pool,
            key.as_ref().map(|k| k.id),
            Some(device_id),
            ip_address,
            user_agent,
            false,
            decision.reason(),
        )
        .await;

        let err = decision.rejection().unwrap_or(AppError::KeyNotFound);
        tracing::info!(device_id, reason = decision.reason(), "validation rejected");
        return Err(err);
    };

    // decide() only returns Valid for an existing key
    let key = key.ok_or(AppError::KeyNotFound)?;

    let existing = sqlx::query_as::<_, Installation>(
        "SELECT * FROM installations WHERE api_key_id = $1 AND device_id = $2",
    )
    .bind(key.id)
    .bind(device_id)
    .fetch_optional(&mut *tx)
    .await?;

    let plan = plan_registration(&key, existing.is_some(), installations_left);

    let installations_left = match (plan, existing) {
        (RegistrationPlan::Refresh { installations_left }, Some(installation)) => {
            // Re-registration: refresh the row, leave the counter alone.
            sqlx::query(
                r#"
                UPDATE installations
                SET device_info = $1,
                    ip_address = $2,
                    last_heartbeat = $3,
                    is_active = TRUE
                WHERE id = $4
                "#,
            )
            .bind(&device_info)
            .bind(ip_address)
            .bind(now)
            .bind(installation.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE api_keys SET last_used = $1 WHERE id = $2")
                .bind(now)
                .bind(key.id)
                .execute(&mut *tx)
                .await?;

            installations_left
        }
        (RegistrationPlan::Create { installations_left }, _) => {
            // First registration for this device: consume a quota slot,
            // then write the row. Increment-first ordering keeps a partial
            // failure detectable (a row without its counted slot cannot
            // exist).
            sqlx::query(
                r#"
                UPDATE api_keys
                SET current_installations = current_installations + 1,
                    last_used = $1
                WHERE id = $2
                "#,
            )
            .bind(now)
            .bind(key.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO installations (
                    api_key_id,
                    device_id,
                    device_info,
                    ip_address,
                    is_active,
                    last_heartbeat
                )
                VALUES ($1, $2, $3, $4, TRUE, $5)
                "#,
            )
            .bind(key.id)
            .bind(device_id)
            .bind(&device_info)
            .bind(ip_address)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            installations_left
        }
        (RegistrationPlan::Refresh { .. }, None) => {
            // plan_registration only answers Refresh for an existing row
            tx.rollback().await?;
            return Err(AppError::InstallationNotFound);
        }
    };

    sqlx::query(
        r#"
        INSERT INTO validation_events (api_key_id, device_id, ip_address, user_agent, success, reason)
        VALUES ($1, $2, $3, $4, TRUE, 'valid')
        "#,
    )
    .bind(key.id)
    .bind(device_id)
    .bind(ip_address)
    .bind(user_agent)
    .execute(&mut *tx)
    .await?;

    // Commit all changes atomically
    tx.commit().await?;

    tracing::info!(key_id = %key.id, device_id, installations_left, "installation registered");

    Ok(ValidationResponse {
        success: true,
        message: "API key validated and installation registered".to_string(),
        installations_left: Some(installations_left),
    })
}

/// Record a heartbeat from an already-registered device.
///
/// Admission is governed by [`admit_heartbeat`]: quota and expiry
/// deliberately do NOT block, only revocation does.
///
/// # Errors
///
/// - `KeyNotFound` / `KeyRevoked`: credential failure
/// - `InstallationNotFound`: this device never registered against the key
pub async fn heartbeat(pool: &DbPool, token: &str, device_id: &str) -> Result<(), AppError> {
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE token = $1 FOR UPDATE")
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::KeyNotFound)?;

    if let Err(err) = admit_heartbeat(&key) {
        tx.rollback().await?;
        return Err(err);
    }

    let updated = sqlx::query(
        r#"
        UPDATE installations
        SET last_heartbeat = $1
        WHERE api_key_id = $2 AND device_id = $3
        "#,
    )
    .bind(now)
    .bind(key.id)
    .bind(device_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Err(AppError::InstallationNotFound);
    }

    sqlx::query("UPDATE api_keys SET last_used = $1 WHERE id = $2")
        .bind(now)
        .bind(key.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// Deactivate one installation.
///
/// Sets `is_active = false` on the (key, device) row. The key's
/// `current_installations` counter is NOT decremented: the counter tracks
/// cumulative slots consumed, so a deactivated slot is not recycled.
///
/// # Errors
///
/// - `KeyNotFound`: no key matches the token (revoked keys may still
///   deactivate their installations)
/// - `InstallationNotFound`: this device never registered against the key
pub async fn deactivate_installation(
    pool: &DbPool,
    token: &str,
    device_id: &str,
) -> Result<(), AppError> {
    let key_id: Uuid = sqlx::query_scalar("SELECT id FROM api_keys WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::KeyNotFound)?;

    let updated = sqlx::query(
        r#"
        UPDATE installations
        SET is_active = FALSE
        WHERE api_key_id = $1 AND device_id = $2
        "#,
    )
    .bind(key_id)
    .bind(device_id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::InstallationNotFound);
    }

    tracing::info!(%key_id, device_id, "installation deactivated");

    Ok(())
}

/// Key-level heartbeat: bump `last_used` on the key itself.
///
/// Requires the key to exist and not be revoked.
pub async fn key_heartbeat(pool: &DbPool, token: &str) -> Result<(), AppError> {
    let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::KeyNotFound)?;

    admit_heartbeat(&key)?;

    sqlx::query("UPDATE api_keys SET last_used = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(key.id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Key-level kill switch: the device holding the token deactivates the key
/// itself. Independent of installation state; idempotent.
pub async fn key_deactivate(pool: &DbPool, token: &str) -> Result<(), AppError> {
    let updated = sqlx::query("UPDATE api_keys SET is_active = FALSE WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::KeyNotFound);
    }

    Ok(())
}

/// Append a validation event to the audit log.
///
/// Best effort: a failed audit write must not mask the validation outcome
/// already decided, so storage errors are logged and swallowed here.
async fn record_event(
    pool: &DbPool,
    api_key_id: Option<Uuid>,
    device_id: Option<&str>,
    ip_address: &str,
    user_agent: Option<&str>,
    success: bool,
    reason: &str,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO validation_events (api_key_id, device_id, ip_address, user_agent, success, reason)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(api_key_id)
    .bind(device_id)
    .bind(ip_address)
    .bind(user_agent)
    .bind(success)
    .bind(reason)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(?api_key_id, device_id, reason, error = %e, "failed to record validation event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(max: i32, current: i32, active: bool) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            token: "ak_1234567890abcdef1234567890ab".to_string(),
            client_id: None,
            client_name: "TechCorp Ltd".to_string(),
            client_email: "admin@techcorp.com".to_string(),
            max_installations: max,
            current_installations: current,
            is_active: active,
            created_at: Utc::now() - Duration::days(30),
            expires_at: None,
            last_used: None,
        }
    }

    #[test]
    fn reregistration_consumes_no_slot() {
        // The engine decided left = 5 - 3 - 1 = 1 assuming a new slot; the
        // refresh path corrects that back to the true remainder and, by
        // taking the Refresh plan at all, never touches the counter.
        let k = key(5, 3, true);
        assert_eq!(
            plan_registration(&k, true, 1),
            RegistrationPlan::Refresh {
                installations_left: 2
            }
        );
    }

    #[test]
    fn first_registration_consumes_the_decided_slot() {
        let k = key(5, 3, true);
        assert_eq!(
            plan_registration(&k, false, 1),
            RegistrationPlan::Create {
                installations_left: 1
            }
        );
    }

    #[test]
    fn reregistration_on_a_full_key_reports_zero_left() {
        // A device re-validating after its key filled up still refreshes;
        // it just learns nothing remains for newcomers.
        let k = key(5, 5, true);
        assert_eq!(
            plan_registration(&k, true, -1),
            RegistrationPlan::Refresh {
                installations_left: 0
            }
        );
    }

    #[test]
    fn heartbeat_admitted_despite_full_quota_and_expiry() {
        let mut k = key(1, 1, true);
        k.expires_at = Some(Utc::now() - Duration::days(1));
        assert!(admit_heartbeat(&k).is_ok());
    }

    #[test]
    fn heartbeat_blocked_by_revocation_only() {
        let k = key(10, 0, false);
        assert!(matches!(admit_heartbeat(&k), Err(AppError::KeyRevoked)));
    }

    /// End-to-end checks against a live PostgreSQL instance.
    ///
    /// Run with a disposable database:
    ///
    /// ```text
    /// DATABASE_URL=postgres://localhost/license_gate_test cargo test -- --ignored
    /// ```
    mod live {
        use super::*;
        use crate::models::api_key::CreateKeyRequest;
        use crate::services::key_service;
        use serde_json::json;

        async fn pool() -> DbPool {
            let url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must point at a disposable test database");
            let pool = crate::db::connect(&url).await.expect("connect");
            crate::db::run_migrations(&pool).await.expect("migrate");
            pool
        }

        async fn issue_key(pool: &DbPool, max_installations: i32) -> ApiKey {
            key_service::create_key(
                pool,
                CreateKeyRequest {
                    client_id: None,
                    client_name: "TechCorp Ltd".to_string(),
                    client_email: "admin@techcorp.com".to_string(),
                    max_installations,
                    expires_at: None,
                },
            )
            .await
            .expect("issue key")
        }

        async fn counter(pool: &DbPool, key_id: Uuid) -> i32 {
            sqlx::query_scalar("SELECT current_installations FROM api_keys WHERE id = $1")
                .bind(key_id)
                .fetch_one(pool)
                .await
                .expect("read counter")
        }

        async fn rows_for(pool: &DbPool, key_id: Uuid) -> i64 {
            sqlx::query_scalar("SELECT COUNT(*) FROM installations WHERE api_key_id = $1")
                .bind(key_id)
                .fetch_one(pool)
                .await
                .expect("count rows")
        }

        async fn register(pool: &DbPool, token: &str, device: &str) -> Result<ValidationResponse, AppError> {
            validate_and_register(
                pool,
                token,
                device,
                json!({"os": "linux", "version": "1.4.2"}),
                "203.0.113.7",
                Some("Docker/24.0.2"),
            )
            .await
        }

        #[tokio::test]
        #[ignore]
        async fn repeated_registration_increments_once() {
            let pool = pool().await;
            let key = issue_key(&pool, 5).await;

            let first = register(&pool, &key.token, "dev-A").await.unwrap();
            let second = register(&pool, &key.token, "dev-A").await.unwrap();

            assert_eq!(first.installations_left, Some(4));
            assert_eq!(second.installations_left, Some(4));
            assert_eq!(counter(&pool, key.id).await, 1);
            assert_eq!(rows_for(&pool, key.id).await, 1);
        }

        #[tokio::test]
        #[ignore]
        async fn full_quota_rejects_new_device_but_not_heartbeat() {
            let pool = pool().await;
            let key = issue_key(&pool, 1).await;

            let first = register(&pool, &key.token, "dev-A").await.unwrap();
            assert_eq!(first.installations_left, Some(0));

            let rejected = register(&pool, &key.token, "dev-B").await;
            assert!(matches!(rejected, Err(AppError::QuotaExceeded)));
            assert_eq!(counter(&pool, key.id).await, 1);
            assert_eq!(rows_for(&pool, key.id).await, 1);

            // The registered device keeps heartbeating at full quota.
            heartbeat(&pool, &key.token, "dev-A").await.unwrap();
        }

        #[tokio::test]
        #[ignore]
        async fn expired_key_still_accepts_heartbeats() {
            let pool = pool().await;
            let key = issue_key(&pool, 5).await;
            register(&pool, &key.token, "dev-A").await.unwrap();

            sqlx::query("UPDATE api_keys SET expires_at = NOW() - INTERVAL '1 day' WHERE id = $1")
                .bind(key.id)
                .execute(&pool)
                .await
                .unwrap();

            heartbeat(&pool, &key.token, "dev-A").await.unwrap();

            let rejected = register(&pool, &key.token, "dev-B").await;
            assert!(matches!(rejected, Err(AppError::KeyExpired)));
        }

        #[tokio::test]
        #[ignore]
        async fn deactivation_does_not_free_the_slot() {
            let pool = pool().await;
            let key = issue_key(&pool, 1).await;
            register(&pool, &key.token, "dev-A").await.unwrap();

            deactivate_installation(&pool, &key.token, "dev-A")
                .await
                .unwrap();

            assert_eq!(counter(&pool, key.id).await, 1);

            // The slot stays consumed: a new device is still over quota.
            let rejected = register(&pool, &key.token, "dev-B").await;
            assert!(matches!(rejected, Err(AppError::QuotaExceeded)));
        }

        #[tokio::test]
        #[ignore]
        async fn raising_the_quota_admits_new_devices() {
            let pool = pool().await;
            let key = issue_key(&pool, 1).await;
            register(&pool, &key.token, "dev-A").await.unwrap();

            key_service::update_key(
                &pool,
                key.id,
                crate::models::api_key::UpdateKeyRequest {
                    max_installations: Some(2),
                    expires_at: None,
                    client_name: None,
                    client_email: None,
                },
            )
            .await
            .unwrap();

            let admitted = register(&pool, &key.token, "dev-B").await.unwrap();
            assert_eq!(admitted.installations_left, Some(0));
            assert_eq!(counter(&pool, key.id).await, 2);
        }
    }
}
