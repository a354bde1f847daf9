//! Dashboard aggregation — read-only derived views over the stores.
//!
//! Everything here is recomputed on demand; no caching, no mutation. Day
//! bucketing follows the server's local calendar day, matching what the
//! dashboard renders.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        api_key::ApiKey,
        dashboard::{DashboardMetrics, InstallationsByDay},
    },
};

/// Number of calendar days covered by the installations time series,
/// inclusive of today.
const SERIES_DAYS: i64 = 30;

/// Keys within this many remaining slots of their quota are flagged.
const NEAR_LIMIT_THRESHOLD: i32 = 2;

/// Start of a local calendar day as a UTC instant.
///
/// Falls back to the later interpretation when midnight is skipped or
/// duplicated by a DST transition.
fn local_day_start(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
        .to_utc()
}

/// Compute the headline dashboard metrics.
pub async fn get_metrics(pool: &DbPool) -> Result<DashboardMetrics, AppError> {
    let today_start = local_day_start(Local::now().date_naive());

    let total_active_keys: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE is_active = TRUE")
            .fetch_one(pool)
            .await?;

    let installations_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM validation_events WHERE success = TRUE AND created_at >= $1",
    )
    .bind(today_start)
    .fetch_one(pool)
    .await?;

    let active_clients: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE status = 'active'")
            .fetch_one(pool)
            .await?;

    let failed_validations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM validation_events WHERE success = FALSE")
            .fetch_one(pool)
            .await?;

    Ok(DashboardMetrics {
        total_active_keys,
        installations_today,
        active_clients,
        failed_validations,
    })
}

/// Installations per day for the trailing 30 calendar days.
///
/// Always returns exactly 30 entries ordered oldest to newest, today last;
/// days without any successful validation event report 0.
pub async fn get_installations_by_day(pool: &DbPool) -> Result<Vec<InstallationsByDay>, AppError> {
    let today = Local::now().date_naive();
    let window_start = local_day_start(today - Duration::days(SERIES_DAYS - 1));

    // Fetch the raw event timestamps and bucket by local calendar day here,
    // where the day arithmetic is unit-tested. The window holds at most 30
    // days of events, so the row volume stays small.
    let timestamps: Vec<(DateTime<Utc>,)> = sqlx::query_as(
        "SELECT created_at FROM validation_events WHERE success = TRUE AND created_at >= $1",
    )
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
    for (ts,) in timestamps {
        *counts.entry(ts.with_timezone(&Local).date_naive()).or_insert(0) += 1;
    }

    Ok(fill_day_series(&counts, today))
}

/// Active keys with at most [`NEAR_LIMIT_THRESHOLD`] quota slots remaining.
pub async fn get_near_limit_keys(pool: &DbPool) -> Result<Vec<ApiKey>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        r#"
        SELECT * FROM api_keys
        WHERE is_active = TRUE
          AND max_installations - current_installations <= $1
        ORDER BY max_installations - current_installations, created_at
        "#,
    )
    .bind(NEAR_LIMIT_THRESHOLD)
    .fetch_all(pool)
    .await?;

    Ok(keys)
}

/// Expand sparse per-day counts into the fixed 30-entry series.
fn fill_day_series(
    counts: &HashMap<NaiveDate, i64>,
    today: NaiveDate,
) -> Vec<InstallationsByDay> {
    (0..SERIES_DAYS)
        .map(|offset| {
            let day = today - Duration::days(SERIES_DAYS - 1 - offset);
            InstallationsByDay {
                date: day.format("%Y-%m-%d").to_string(),
                installations: counts.get(&day).copied().unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn series_has_exactly_thirty_entries_oldest_first() {
        let today = day("2026-08-27");
        let series = fill_day_series(&HashMap::new(), today);

        assert_eq!(series.len(), 30);
        assert_eq!(series.first().unwrap().date, "2026-07-29");
        assert_eq!(series.last().unwrap().date, "2026-08-27");
        assert!(series.iter().all(|e| e.installations == 0));
    }

    #[test]
    fn series_reports_counts_and_zero_fills_gaps() {
        let today = day("2026-08-27");
        let mut counts = HashMap::new();
        counts.insert(day("2026-08-25"), 3);

        let series = fill_day_series(&counts, today);

        let d25 = series.iter().find(|e| e.date == "2026-08-25").unwrap();
        let d26 = series.iter().find(|e| e.date == "2026-08-26").unwrap();
        assert_eq!(d25.installations, 3);
        assert_eq!(d26.installations, 0);
    }

    #[test]
    fn counts_outside_window_are_ignored() {
        let today = day("2026-08-27");
        let mut counts = HashMap::new();
        counts.insert(day("2026-07-28"), 99); // day 31, just past the window
        counts.insert(day("2026-07-29"), 7); // oldest included day

        let series = fill_day_series(&counts, today);

        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, "2026-07-29");
        assert_eq!(series[0].installations, 7);
        assert_eq!(series.iter().map(|e| e.installations).sum::<i64>(), 7);
    }

    #[test]
    fn series_spans_month_boundaries() {
        let today = day("2026-01-05");
        let series = fill_day_series(&HashMap::new(), today);

        assert_eq!(series.first().unwrap().date, "2025-12-07");
        assert_eq!(series.last().unwrap().date, "2026-01-05");
    }
}
