//! Dashboard aggregate types.
//!
//! These are read-only views computed on demand from the key, installation,
//! client and validation-event tables. Nothing here is persisted.

use serde::Serialize;

/// Headline metrics for the dashboard landing page.
#[derive(Debug, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// Count of API keys with `is_active = true`
    pub total_active_keys: i64,

    /// Successful validation events during the current local calendar day
    pub installations_today: i64,

    /// Count of clients with status `active`
    pub active_clients: i64,

    /// Lifetime count of rejected validation attempts
    pub failed_validations: i64,
}

/// One bucket of the 30-day installation time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationsByDay {
    /// Calendar day, formatted `YYYY-MM-DD`
    pub date: String,

    /// Successful validation events on that day
    pub installations: i64,
}
