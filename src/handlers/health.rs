//! Liveness endpoint for load balancers and uptime probes.

use crate::{db::DbPool, error::AppError};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body returned by `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service identifier, so probes can tell deployments apart
    pub service: &'static str,

    /// Running build version
    pub version: &'static str,

    /// Whether the key store answered a round-trip query
    pub database: &'static str,

    /// Server time at the moment of the probe
    pub timestamp: DateTime<Utc>,
}

/// Report whether the service can reach its store.
///
/// A licensing server that cannot read keys is down for every practical
/// purpose, so the probe round-trips a trivial query instead of answering
/// from memory. Store failures surface as the standard 500 envelope.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "service": "license-gate",
///   "version": "0.1.0",
///   "database": "reachable",
///   "timestamp": "2026-08-27T19:00:00Z"
/// }
/// ```
pub async fn health_check(State(pool): State<DbPool>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(Json(HealthResponse {
        service: "license-gate",
        version: env!("CARGO_PKG_VERSION"),
        database: "reachable",
        timestamp: Utc::now(),
    }))
}
