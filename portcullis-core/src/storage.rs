//! Records kept by the stateful services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-client rate limiting state.
///
/// A record exists only while a client has recent failures. It is created by
/// the first failure and discarded when its window or its block runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Failures counted in the current window
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
    /// Set once the client has been observed over the limit
    pub blocked_until: Option<DateTime<Utc>>,
    pub successful_attempts: u32,
}

impl RateLimitRecord {
    /// State after the first failure of a window.
    pub fn first_failure(at: DateTime<Utc>) -> Self {
        Self {
            attempts: 1,
            last_attempt_at: at,
            blocked_until: None,
            successful_attempts: 0,
        }
    }

    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }

    /// A block that has been set and has run out.
    pub fn block_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now >= until)
    }
}

/// One authentication attempt as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    pub client_identity: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl LoginAttemptRecord {
    pub fn new(
        client_identity: impl Into<String>,
        success: bool,
        email: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            client_identity: client_identity.into(),
            timestamp,
            success,
            email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_block_window() {
        let now = Utc::now();
        let mut record = RateLimitRecord::first_failure(now);
        assert!(!record.is_blocked_at(now));
        assert!(!record.block_expired_at(now));

        record.blocked_until = Some(now + Duration::minutes(30));
        assert!(record.is_blocked_at(now + Duration::minutes(29)));
        assert!(!record.is_blocked_at(now + Duration::minutes(30)));
        assert!(record.block_expired_at(now + Duration::minutes(30)));
    }

    #[test]
    fn test_attempt_record_omits_missing_email() {
        let record = LoginAttemptRecord::new("10.0.0.1", false, None, Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["success"], false);
    }
}
