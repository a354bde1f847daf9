//! Validation engine — the pure decision function over one API key snapshot.
//!
//! Given the key record a presented token resolved to (or its absence), this
//! module decides whether a registration attempt is accepted and, if not, why.
//! It performs no I/O and mutates nothing; side effects belong to the
//! registration workflow.
//!
//! # Rule Ordering
//!
//! Rejections are evaluated in a fixed order, and the first match wins:
//!
//! 1. not found
//! 2. revoked
//! 3. quota exceeded
//! 4. expired
//!
//! The ordering is part of the contract, not an implementation detail: when
//! several conditions hold at once it determines which error a caller sees.
//! A revoked, expired, full key reports "revoked".

use chrono::{DateTime, Utc};

use crate::{error::AppError, models::api_key::ApiKey};

/// Outcome of validating a presented token against its key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No key with a matching token exists
    NotFound,

    /// Key exists but has been revoked
    Revoked,

    /// Key is active but its installation quota is fully consumed
    QuotaExceeded,

    /// Key is past its expiry timestamp
    Expired,

    /// Accepted. `installations_left` is the quota remaining *after* the
    /// registration this decision authorizes, so it already accounts for the
    /// slot the current call is about to consume.
    Valid { installations_left: i32 },
}

/// Decide whether a registration attempt against `key` is accepted.
///
/// `key` is the record the presented token resolved to via exact match
/// (no normalization — lookup is case and whitespace sensitive), or `None`
/// if no record matched.
pub fn decide(key: Option<&ApiKey>, now: DateTime<Utc>) -> Decision {
    let Some(key) = key else {
        return Decision::NotFound;
    };

    if !key.is_active {
        return Decision::Revoked;
    }

    if key.current_installations >= key.max_installations {
        return Decision::QuotaExceeded;
    }

    if let Some(expires_at) = key.expires_at
        && expires_at < now
    {
        return Decision::Expired;
    }

    Decision::Valid {
        installations_left: key.max_installations - key.current_installations - 1,
    }
}

impl Decision {
    /// Maps a rejection to its error variant; `None` for `Valid`.
    pub fn rejection(self) -> Option<AppError> {
        match self {
            Decision::NotFound => Some(AppError::KeyNotFound),
            Decision::Revoked => Some(AppError::KeyRevoked),
            Decision::QuotaExceeded => Some(AppError::QuotaExceeded),
            Decision::Expired => Some(AppError::KeyExpired),
            Decision::Valid { .. } => None,
        }
    }

    /// Audit-log code for this decision.
    pub fn reason(self) -> &'static str {
        match self {
            Decision::NotFound => "key_not_found",
            Decision::Revoked => "key_revoked",
            Decision::QuotaExceeded => "quota_exceeded",
            Decision::Expired => "key_expired",
            Decision::Valid { .. } => "valid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn key(max: i32, current: i32, active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
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
            expires_at,
            last_used: None,
        }
    }

    #[test]
    fn missing_key_is_not_found() {
        assert_eq!(decide(None, Utc::now()), Decision::NotFound);
    }

    #[test]
    fn revoked_wins_over_expiry_and_quota() {
        // Revoked, expired, and full all at once: revocation is reported.
        let now = Utc::now();
        let k = key(5, 5, false, Some(now - Duration::days(1)));
        assert_eq!(decide(Some(&k), now), Decision::Revoked);
    }

    #[test]
    fn quota_checked_before_expiry() {
        let now = Utc::now();
        let k = key(5, 5, true, Some(now - Duration::days(1)));
        assert_eq!(decide(Some(&k), now), Decision::QuotaExceeded);
    }

    #[test]
    fn expired_key_rejected() {
        let now = Utc::now();
        let k = key(5, 0, true, Some(now - Duration::seconds(1)));
        assert_eq!(decide(Some(&k), now), Decision::Expired);
    }

    #[test]
    fn null_expiry_never_expires() {
        let now = Utc::now();
        let k = key(5, 0, true, None);
        assert_eq!(
            decide(Some(&k), now),
            Decision::Valid {
                installations_left: 4
            }
        );
    }

    #[test]
    fn future_expiry_still_valid() {
        let now = Utc::now();
        let k = key(3, 1, true, Some(now + Duration::days(10)));
        assert_eq!(
            decide(Some(&k), now),
            Decision::Valid {
                installations_left: 1
            }
        );
    }

    #[test]
    fn installations_left_reserves_current_slot() {
        // 4 of 5 consumed: this call takes the last slot, so zero remain.
        let now = Utc::now();
        let k = key(5, 4, true, None);
        assert_eq!(
            decide(Some(&k), now),
            Decision::Valid {
                installations_left: 0
            }
        );

        // At 5 of 5 a new device is rejected.
        let k = key(5, 5, true, None);
        assert_eq!(decide(Some(&k), now), Decision::QuotaExceeded);
    }

    #[test]
    fn revocation_blocks_validation_permanently() {
        let now = Utc::now();
        let k = key(10, 0, false, None);
        assert_eq!(decide(Some(&k), now), Decision::Revoked);
        // Nothing short of flipping is_active back changes the outcome.
        assert_eq!(
            decide(Some(&k), now + Duration::days(365)),
            Decision::Revoked
        );
    }
}
