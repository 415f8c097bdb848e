//! Persisted OAuth credential for one (user, service) pair.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Service key under which the calendar provider credential is stored.
pub const CALENDAR_SERVICE: &str = "calendar";

/// Refresh when the access token expires within this window.
pub const EXPIRY_SKEW_MINUTES: i64 = 5;

/// A stored OAuth token set. Unique per `(user_id, service)`; the refresh
/// token is required for unattended refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    pub service: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Set when a refresh was rejected; cleared by a new OAuth handshake.
    pub invalid: bool,
}

impl Credential {
    /// Whether the access token is expired or inside the refresh skew.
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::minutes(EXPIRY_SKEW_MINUTES) >= self.expires_at
    }
}

/// Token material returned by the OAuth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    /// Providers typically omit this on refresh; callers keep the old one.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn from_expires_in(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Self {
        TokenSet {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_in_secs: i64) -> Credential {
        Credential {
            user_id: "user-1".to_string(),
            service: CALENDAR_SERVICE.to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            last_sync_at: None,
            invalid: false,
        }
    }

    #[test]
    fn fresh_token_does_not_need_refresh() {
        assert!(!credential(3600).needs_refresh());
    }

    #[test]
    fn token_inside_skew_needs_refresh() {
        // 2 minutes left is inside the 5 minute skew
        assert!(credential(120).needs_refresh());
    }

    #[test]
    fn expired_token_needs_refresh() {
        assert!(credential(-60).needs_refresh());
    }
}
