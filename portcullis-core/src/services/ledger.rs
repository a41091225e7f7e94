//! Chronological ledger of login attempts.
//!
//! Recording an attempt fans out: the attempt is appended here, the rate
//! limiter counts it, and the audit log receives a `login_attempt` event.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    clock::{self, Clock},
    config::ProtectionConfig,
    events::{SecurityEventKind, Severity},
    repositories::{AttemptRepository, EventRepository, RateLimitRepository},
    services::{AuditLogService, RateLimitService},
    storage::LoginAttemptRecord,
};

/// Default number of attempts returned by [`LedgerService::recent`].
pub const DEFAULT_RECENT_ATTEMPTS: usize = 50;

/// Attempt totals over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub total: usize,
    pub failed: usize,
}

pub struct LedgerService<A, L, E>
where
    A: AttemptRepository,
    L: RateLimitRepository,
    E: EventRepository,
{
    repository: Arc<A>,
    rate_limit: Arc<RateLimitService<L>>,
    audit: Arc<AuditLogService<E>>,
    clock: Arc<dyn Clock>,
    config: ProtectionConfig,
}

impl<A, L, E> LedgerService<A, L, E>
where
    A: AttemptRepository,
    L: RateLimitRepository,
    E: EventRepository,
{
    pub fn new(
        repository: Arc<A>,
        rate_limit: Arc<RateLimitService<L>>,
        audit: Arc<AuditLogService<E>>,
        clock: Arc<dyn Clock>,
        config: ProtectionConfig,
    ) -> Self {
        Self {
            repository,
            rate_limit,
            audit,
            clock,
            config,
        }
    }

    /// Record an attempt and cascade it into the rate limiter and audit log.
    pub async fn record(
        &self,
        client_identity: &str,
        success: bool,
        email: Option<&str>,
    ) -> Result<LoginAttemptRecord, Error> {
        let now = self.clock.now();
        let attempt = LoginAttemptRecord::new(
            client_identity,
            success,
            email.map(str::to_string),
            now,
        );

        self.repository.append(attempt.clone()).await?;
        self.prune().await?;

        if success {
            self.rate_limit.record_success(client_identity).await?;
        } else {
            self.rate_limit.record_failure(client_identity).await?;
        }

        let (severity, outcome) = if success {
            (Severity::Low, "succeeded")
        } else {
            (Severity::Medium, "failed")
        };
        let details = match email {
            Some(email) => format!("Login attempt for {email} {outcome}"),
            None => format!("Login attempt {outcome}"),
        };
        self.audit
            .record(
                SecurityEventKind::LoginAttempt,
                severity,
                details,
                Some(client_identity),
            )
            .await?;

        Ok(attempt)
    }

    /// Up to `limit` attempts, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error> {
        self.repository.recent(limit).await
    }

    /// Whether a client has tried more distinct emails than allowed within
    /// the attempt horizon.
    pub async fn detect_suspicious(&self, client_identity: &str) -> Result<bool, Error> {
        let cutoff = clock::saturating_sub(self.clock.now(), self.config.attempt_horizon);
        let attempts = self.repository.since(cutoff).await?;

        let emails: HashSet<&str> = attempts
            .iter()
            .filter(|attempt| attempt.client_identity == client_identity)
            .filter_map(|attempt| attempt.email.as_deref())
            .collect();

        Ok(emails.len() > self.config.suspicious_email_threshold)
    }

    /// Totals of attempts at or after `cutoff`.
    pub async fn counts_since(&self, cutoff: DateTime<Utc>) -> Result<AttemptCounts, Error> {
        let attempts = self.repository.since(cutoff).await?;
        Ok(AttemptCounts {
            total: attempts.len(),
            failed: attempts.iter().filter(|attempt| !attempt.success).count(),
        })
    }

    /// Drop attempts outside the horizon or beyond the retention cap.
    pub async fn prune(&self) -> Result<usize, Error> {
        let cutoff = clock::saturating_sub(self.clock.now(), self.config.attempt_horizon);
        self.repository
            .prune(cutoff, self.config.max_attempt_records)
            .await
    }

    pub async fn len(&self) -> Result<usize, Error> {
        self.repository.count().await
    }
}
