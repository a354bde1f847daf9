//! Dashboard endpoints — read-only aggregates for the operator UI.
//!
//! - GET /api/v1/dashboard/metrics - headline counters
//! - GET /api/v1/dashboard/installations-by-day - 30-day time series
//! - GET /api/v1/dashboard/near-limit - keys close to their quota

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::ApiKey,
        dashboard::{DashboardMetrics, InstallationsByDay},
    },
    services::dashboard_service,
};

/// Headline dashboard metrics.
///
/// # Endpoint
///
/// `GET /api/v1/dashboard/metrics`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "total_active_keys": 3,
///   "installations_today": 12,
///   "active_clients": 3,
///   "failed_validations": 7
/// }
/// ```
pub async fn metrics(State(pool): State<DbPool>) -> Result<Json<DashboardMetrics>, AppError> {
    let metrics = dashboard_service::get_metrics(&pool).await?;

    Ok(Json(metrics))
}

/// Installations per day over the trailing 30 days, oldest first.
///
/// # Endpoint
///
/// `GET /api/v1/dashboard/installations-by-day`
pub async fn installations_by_day(
    State(pool): State<DbPool>,
) -> Result<Json<Vec<InstallationsByDay>>, AppError> {
    let series = dashboard_service::get_installations_by_day(&pool).await?;

    Ok(Json(series))
}

/// Active keys with two or fewer quota slots remaining.
///
/// # Endpoint
///
/// `GET /api/v1/dashboard/near-limit`
pub async fn near_limit(State(pool): State<DbPool>) -> Result<Json<Vec<ApiKey>>, AppError> {
    let keys = dashboard_service::get_near_limit_keys(&pool).await?;

    Ok(Json(keys))
}
