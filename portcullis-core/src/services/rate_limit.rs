//! Per-client sliding-window rate limiting with timed lockout.
//!
//! # State machine
//!
//! Each client identity is in one of three states:
//!
//! - **Unknown**: no record. The full budget is available.
//! - **Open**: a record with fewer than `max_attempts` failures inside the
//!   window. Failures increment the count; a failure after the window has
//!   lapsed starts a new window at one attempt.
//! - **Limited**: `blocked_until` is set. Every status query reports the
//!   client as blocked until the block runs out.
//!
//! The Open to Limited transition happens on a status query that finds the
//! count at or above the limit. That query is a read-modify-write through
//! [`RateLimitRepository::update`], so it sets the block under the store's
//! write lock. Once the block has run out, or an unblocked record's window
//! has lapsed, the query deletes the record and the client is Unknown again
//! with its full budget.
//!
//! # Example
//!
//! ```rust,ignore
//! let limiter = RateLimitService::new(repository, clock, ProtectionConfig::default());
//!
//! let status = limiter.status("203.0.113.7").await?;
//! if status.is_blocked {
//!     println!("try again in {}", status.describe_wait());
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    clock::{self, Clock},
    config::ProtectionConfig,
    repositories::RateLimitRepository,
    storage::RateLimitRecord,
};

/// Rate limiting state of a client as seen by a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub client_identity: String,
    pub is_blocked: bool,
    /// Failures counted in the current window
    pub attempts: u32,
    pub remaining_attempts: u32,
    pub blocked_until: Option<DateTime<Utc>>,
    #[serde(with = "crate::config::optional_duration_secs")]
    pub time_remaining: Option<Duration>,
    /// Whether this query is the one that imposed the block
    #[serde(default)]
    pub escalated: bool,
}

impl RateLimitStatus {
    fn fresh(client_identity: &str, max_attempts: u32) -> Self {
        Self {
            client_identity: client_identity.to_string(),
            is_blocked: false,
            attempts: 0,
            remaining_attempts: max_attempts,
            blocked_until: None,
            time_remaining: None,
            escalated: false,
        }
    }

    fn from_record(
        client_identity: &str,
        record: &RateLimitRecord,
        max_attempts: u32,
        now: DateTime<Utc>,
        escalated: bool,
    ) -> Self {
        let is_blocked = record.is_blocked_at(now);
        let blocked_until = if is_blocked { record.blocked_until } else { None };

        Self {
            client_identity: client_identity.to_string(),
            is_blocked,
            attempts: record.attempts,
            remaining_attempts: if is_blocked {
                0
            } else {
                max_attempts.saturating_sub(record.attempts)
            },
            blocked_until,
            time_remaining: blocked_until.map(|until| until - now),
            escalated,
        }
    }

    /// Seconds until the block lifts, rounded up. Zero when not blocked.
    pub fn retry_after_seconds(&self) -> i64 {
        match self.time_remaining {
            Some(remaining) if remaining > Duration::zero() => {
                let secs = remaining.num_seconds();
                if remaining > Duration::seconds(secs) {
                    secs + 1
                } else {
                    secs
                }
            }
            _ => 0,
        }
    }

    /// Human-readable time until the block lifts, e.g. "29 minutes".
    pub fn describe_wait(&self) -> String {
        describe_seconds(self.retry_after_seconds())
    }
}

/// Render a wait in the largest whole unit, rounding up below an hour.
pub fn describe_seconds(secs: i64) -> String {
    let secs = secs.max(0);
    let (value, unit) = if secs < 60 {
        (secs, "second")
    } else if secs < 3600 {
        ((secs + 59) / 60, "minute")
    } else if secs < 86400 {
        (secs / 3600, "hour")
    } else {
        (secs / 86400, "day")
    };

    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// Service for per-client rate limiting.
///
/// All state lives in the repository; the service only holds configuration
/// and the clock, so it can be shared freely behind an `Arc`.
pub struct RateLimitService<R: RateLimitRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: ProtectionConfig,
}

impl<R: RateLimitRepository> RateLimitService<R> {
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, config: ProtectionConfig) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    /// Current state for a client, applying any due transition.
    ///
    /// Never creates a record. If protection is disabled, it always returns
    /// a fresh status.
    pub async fn status(&self, client_identity: &str) -> Result<RateLimitStatus, Error> {
        let max_attempts = self.config.max_attempts;
        if !self.config.enabled {
            return Ok(RateLimitStatus::fresh(client_identity, max_attempts));
        }

        let now = self.clock.now();
        let window = self.config.window;
        let block_duration = self.config.block_duration;
        let mut escalated = false;

        let stored = self
            .repository
            .update(client_identity, &mut |current| {
                let mut record = current?;

                if record.block_expired_at(now) {
                    return None;
                }
                if record.is_blocked_at(now) {
                    return Some(record);
                }
                if now - record.last_attempt_at > window {
                    return None;
                }
                if record.attempts >= max_attempts {
                    record.blocked_until = Some(clock::saturating_add(now, block_duration));
                    escalated = true;
                }
                Some(record)
            })
            .await?;

        if escalated {
            tracing::info!(
                client = %client_identity,
                block_secs = block_duration.num_seconds(),
                "Client exceeded the attempt limit and is now blocked"
            );
        }

        Ok(match stored {
            Some(record) => {
                RateLimitStatus::from_record(client_identity, &record, max_attempts, now, escalated)
            }
            None => RateLimitStatus::fresh(client_identity, max_attempts),
        })
    }

    /// Record a failed attempt for a client.
    ///
    /// Starts a new window at one attempt when there is no record, the
    /// previous window has lapsed, or a previous block has run out. The
    /// returned status does not escalate; the next [`status`](Self::status)
    /// query does.
    pub async fn record_failure(&self, client_identity: &str) -> Result<RateLimitStatus, Error> {
        let max_attempts = self.config.max_attempts;
        if !self.config.enabled {
            return Ok(RateLimitStatus::fresh(client_identity, max_attempts));
        }

        let now = self.clock.now();
        let window = self.config.window;

        let stored = self
            .repository
            .update(client_identity, &mut |current| {
                let record = match current {
                    Some(mut record)
                        if !record.block_expired_at(now)
                            && (record.is_blocked_at(now)
                                || now - record.last_attempt_at <= window) =>
                    {
                        record.attempts = record.attempts.saturating_add(1);
                        record.last_attempt_at = now;
                        record
                    }
                    _ => RateLimitRecord::first_failure(now),
                };
                Some(record)
            })
            .await?;

        Ok(match stored {
            Some(record) => {
                tracing::debug!(
                    client = %client_identity,
                    attempts = record.attempts,
                    "Recorded failed attempt"
                );
                RateLimitStatus::from_record(client_identity, &record, max_attempts, now, false)
            }
            None => RateLimitStatus::fresh(client_identity, max_attempts),
        })
    }

    /// Record a successful attempt for a client.
    ///
    /// Decays the failure count by one and never lifts a block. A client
    /// without a record is left untouched.
    pub async fn record_success(&self, client_identity: &str) -> Result<(), Error> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = self.clock.now();
        self.repository
            .update(client_identity, &mut |current| {
                current.map(|mut record| {
                    record.successful_attempts = record.successful_attempts.saturating_add(1);
                    record.attempts = record.attempts.saturating_sub(1);
                    record.last_attempt_at = now;
                    record
                })
            })
            .await?;

        Ok(())
    }

    /// Forget a client. Clearing an unknown client is a no-op.
    pub async fn clear(&self, client_identity: &str) -> Result<bool, Error> {
        let removed = self.repository.remove(client_identity).await?;
        if removed {
            tracing::info!(client = %client_identity, "Cleared rate limit record");
        }
        Ok(removed)
    }

    /// Forget every client.
    pub async fn clear_all(&self) -> Result<usize, Error> {
        let count = self.repository.clear().await?;
        tracing::info!(count = count, "Cleared all rate limit records");
        Ok(count)
    }

    /// Remove idle and expired records.
    ///
    /// A record goes when its block has run out, or when it is not blocked
    /// and its last attempt is older than twice the window.
    ///
    /// This departs from a plain "idle for twice the window" rule: a record
    /// that is still actively blocked is kept however old its last attempt
    /// is, so a sweep never lifts a lockout early. Such a record is removed
    /// by the first sweep after its block runs out.
    pub async fn sweep(&self) -> Result<usize, Error> {
        let now = self.clock.now();
        let stale_before = clock::saturating_sub(now, self.config.stale_record_age());

        self.repository
            .retain(&mut |_, record| {
                if record.block_expired_at(now) {
                    return false;
                }
                record.is_blocked_at(now) || record.last_attempt_at > stale_before
            })
            .await
    }

    /// Number of clients currently blocked.
    pub async fn active_blocks(&self) -> Result<usize, Error> {
        let now = self.clock.now();
        let records = self.repository.list().await?;
        Ok(records
            .iter()
            .filter(|(_, record)| record.is_blocked_at(now))
            .count())
    }

    /// Number of clients with a record.
    pub async fn tracked_clients(&self) -> Result<usize, Error> {
        self.repository.count().await
    }
}
