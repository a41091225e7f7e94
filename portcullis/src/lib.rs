//! # Portcullis
//!
//! Portcullis is a self-contained guard layer that sits in front of an admin
//! login endpoint. It does not verify credentials itself; that is delegated to
//! an [`IdentityBackend`]. What it adds around that call is:
//!
//! - screening of raw input for script-injection payloads
//! - email and password strength validation
//! - a per-client sliding-window rate limiter with a timed lockout
//! - a bounded ledger of attempts with anomaly detection
//! - a bounded, severity-tagged security audit log with operator alerts
//!
//! State is held in a [`RepositoryProvider`]; the default `memory` feature
//! provides an in-process one. Expired state is swept by a background task
//! bound to the lifetime of the [`Portcullis`] value.
//!
//! ## Example
//!
//! ```rust,no_run
//! use portcullis::{PortcullisBuilder, StaticIdentityBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = StaticIdentityBackend::new()
//!         .with_account("owner@example.com", "Sup3r$ecretPass", &["admin"]);
//!
//!     let gate = PortcullisBuilder::new()
//!         .with_memory_storage()
//!         .with_backend(Arc::new(backend))
//!         .build()
//!         .await?;
//!
//!     match gate.authenticate("203.0.113.7", "owner@example.com", "Sup3r$ecretPass").await {
//!         Ok(principal) => println!("welcome {}", principal.email),
//!         Err(e) => println!("denied ({}): {e}", e.reason().unwrap_or("internal")),
//!     }
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

pub mod backend;
pub mod builder;
pub mod metrics;
mod sweeper;

pub use backend::StaticIdentityBackend;
pub use builder::{
    NoBackend, NoStorage, PortcullisBuilder, PortcullisBuilderError, WithBackend, WithStorage,
};
pub use metrics::{SecurityMetrics, SweepReport};

/// Re-export core types from portcullis_core
///
/// These types are commonly used when working with the Portcullis API.
pub use portcullis_core::{
    AccessError, BackendError, Clock, Error, EventBus, EventHandler, IdentityBackend,
    LoginAttemptRecord, ManualClock, PasswordAssessment, PasswordStrength, Principal,
    ProtectionConfig, RateLimitStatus, RepositoryProvider, SecurityEvent, SecurityEventKind,
    Severity, SystemClock, ThreatKind,
};
pub use portcullis_core::{
    clock, config, error, events, identity, repositories, threat, validation,
};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "memory")]
pub use portcullis_storage_memory::MemoryRepositoryProvider;

use sweeper::{AuditLog, Ledger, Maintenance, RateLimiter, Sweeper};

/// The access gate in front of a login endpoint.
///
/// Construct it with [`PortcullisBuilder`]. All state is owned by the gate's
/// repository provider; dropping the gate stops its background sweep.
pub struct Portcullis<R: RepositoryProvider, B: IdentityBackend> {
    repositories: Arc<R>,
    backend: Arc<B>,
    clock: Arc<dyn Clock>,
    config: ProtectionConfig,
    rate_limit: Arc<RateLimiter<R>>,
    ledger: Arc<Ledger<R>>,
    audit: Arc<AuditLog<R>>,
    sweeper: Option<Sweeper>,
}

impl<R: RepositoryProvider, B: IdentityBackend> Portcullis<R, B> {
    /// The active configuration.
    pub fn config(&self) -> &ProtectionConfig {
        &self.config
    }

    /// Whether the background sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Authenticate an admin login attempt.
    ///
    /// The checks run in order and the first one to fail decides the
    /// outcome:
    ///
    /// 1. neither input carries an injection payload (`invalid_input`)
    /// 2. the email is well formed (`invalid_email`)
    /// 3. the password meets the strength rules (`weak_credentials`)
    /// 4. the client is not locked out (`rate_limited`)
    /// 5. the identity backend accepts the credentials (`backend_failure`)
    /// 6. the principal holds an elevated role (`insufficient_privilege`)
    ///
    /// Steps 5 and 6 count toward the client's rate limit when they fail.
    /// Storage failures surface as [`Error::Storage`] and deny access.
    pub async fn authenticate(
        &self,
        client_identity: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, Error> {
        let clean_email = threat::sanitize(email);
        if let Some((field, raw)) = self.find_payload(email, &clean_email, password) {
            let kinds = threat::scan(raw)
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.audit
                .record(
                    SecurityEventKind::XssAttempt,
                    Severity::High,
                    format!("Blocked {kinds} payload in {field}"),
                    Some(client_identity),
                )
                .await?;
            return Err(AccessError::InvalidInput.into());
        }

        if !validation::validate_email(&clean_email) {
            return Err(AccessError::InvalidEmailFormat.into());
        }

        let assessment = validation::validate_password_strength(password);
        if !assessment.valid {
            return Err(AccessError::WeakCredentials {
                errors: assessment.errors,
            }
            .into());
        }

        let status = self.rate_limit.status(client_identity).await?;
        if status.is_blocked {
            self.report_blocked(client_identity, &status).await?;
            return Err(AccessError::RateLimited {
                retry_after_secs: status.retry_after_seconds(),
                wait: status.describe_wait(),
            }
            .into());
        }

        let principal = match self.sign_in(&clean_email, password).await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::debug!(
                    client = %client_identity,
                    error = %e,
                    "Identity backend refused sign-in"
                );
                self.record_failure(client_identity, &clean_email).await?;
                return Err(AccessError::BackendFailure(e.message).into());
            }
        };

        if !principal.has_any_role(&self.config.elevated_roles) {
            if let Err(e) = self.backend.sign_out().await {
                tracing::warn!(
                    error = %e,
                    principal = %principal.id,
                    "Failed to revoke session of unprivileged principal"
                );
            }
            self.audit
                .record(
                    SecurityEventKind::SecurityViolation,
                    Severity::High,
                    format!(
                        "Account {} without an elevated role attempted admin access",
                        principal.email
                    ),
                    Some(client_identity),
                )
                .await?;
            self.record_failure(client_identity, &clean_email).await?;
            return Err(AccessError::InsufficientPrivilege.into());
        }

        self.ledger
            .record(client_identity, true, Some(&clean_email))
            .await?;
        self.audit
            .record(
                SecurityEventKind::AdminAccess,
                Severity::Low,
                format!("Admin access granted to {}", principal.email),
                Some(client_identity),
            )
            .await?;

        Ok(principal)
    }

    /// Current rate limiting state of a client.
    pub async fn rate_limit_status(&self, client_identity: &str) -> Result<RateLimitStatus, Error> {
        self.rate_limit.status(client_identity).await
    }

    /// Lift any lockout and forget the failures of a client.
    pub async fn clear_rate_limit(&self, client_identity: &str) -> Result<bool, Error> {
        self.rate_limit.clear(client_identity).await
    }

    /// Lift every lockout.
    pub async fn clear_all_rate_limits(&self) -> Result<usize, Error> {
        self.rate_limit.clear_all().await
    }

    /// Up to `limit` login attempts, newest first.
    pub async fn recent_attempts(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error> {
        self.ledger.recent(limit).await
    }

    /// Up to `limit` audit events, newest first.
    pub async fn recent_events(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error> {
        self.audit.recent(limit).await
    }

    /// The whole audit log as a JSON array.
    pub async fn export_events(&self) -> Result<String, Error> {
        self.audit.export_json().await
    }

    /// Password strength feedback, e.g. for a password-change form.
    pub fn assess_password(&self, password: &str) -> PasswordAssessment {
        validation::validate_password_strength(password)
    }

    /// Dashboard counters.
    pub async fn security_metrics(&self) -> Result<SecurityMetrics, Error> {
        let now = self.clock.now();
        let last_hour = self
            .ledger
            .counts_since(now - chrono::Duration::hours(1))
            .await?;
        let day_ago = now - chrono::Duration::days(1);

        Ok(SecurityMetrics {
            attempts_last_hour: last_hour.total,
            failed_attempts_last_hour: last_hour.failed,
            attempts_last_day: self
                .audit
                .count_since(Some(SecurityEventKind::LoginAttempt), None, day_ago)
                .await?,
            active_blocks: self.rate_limit.active_blocks().await?,
            tracked_clients: self.rate_limit.tracked_clients().await?,
            high_severity_events_last_day: self
                .audit
                .count_since(None, Some(Severity::High), day_ago)
                .await?,
        })
    }

    /// Run one sweep immediately.
    pub async fn sweep_now(&self) -> Result<SweepReport, Error> {
        self.maintenance().run().await
    }

    /// Stop the background sweep and wait for it to finish.
    pub async fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop().await;
        }
    }

    /// Assemble the gate from a configured builder.
    pub(crate) fn from_builder(
        repositories: Arc<R>,
        backend: Arc<B>,
        clock: Arc<dyn Clock>,
        config: ProtectionConfig,
        event_bus: EventBus,
    ) -> Self {
        use portcullis_core::repositories::{
            AttemptRepositoryAdapter, EventRepositoryAdapter, RateLimitRepositoryAdapter,
        };
        use portcullis_core::services::{AuditLogService, LedgerService, RateLimitService};

        let rate_limit = Arc::new(RateLimitService::new(
            Arc::new(RateLimitRepositoryAdapter::new(repositories.clone())),
            clock.clone(),
            config.clone(),
        ));
        let audit = Arc::new(AuditLogService::new(
            Arc::new(EventRepositoryAdapter::new(repositories.clone())),
            clock.clone(),
            config.clone(),
            event_bus,
        ));
        let ledger = Arc::new(LedgerService::new(
            Arc::new(AttemptRepositoryAdapter::new(repositories.clone())),
            rate_limit.clone(),
            audit.clone(),
            clock.clone(),
            config.clone(),
        ));

        Self {
            repositories,
            backend,
            clock,
            config,
            rate_limit,
            ledger,
            audit,
            sweeper: None,
        }
    }

    pub(crate) fn start_sweeper(&mut self, period: std::time::Duration) {
        if self.sweeper.is_none() {
            self.sweeper = Some(Sweeper::spawn(self.maintenance(), period));
        }
    }

    fn maintenance(&self) -> Maintenance<R> {
        Maintenance {
            rate_limit: self.rate_limit.clone(),
            ledger: self.ledger.clone(),
            audit: self.audit.clone(),
        }
    }

    /// The first input that both changes under sanitization and matches a
    /// threat pattern.
    fn find_payload<'a>(
        &self,
        email: &'a str,
        clean_email: &str,
        password: &'a str,
    ) -> Option<(&'static str, &'a str)> {
        if clean_email != email && threat::detect_threat(email) {
            return Some(("email", email));
        }
        if threat::sanitize(password) != password && threat::detect_threat(password) {
            return Some(("password", password));
        }
        None
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, BackendError> {
        let limit = self
            .config
            .backend_timeout
            .and_then(|timeout| timeout.to_std().ok());

        match limit {
            Some(limit) => {
                match tokio::time::timeout(limit, self.backend.sign_in(email, password)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = limit.as_millis() as u64,
                            "Identity backend timed out"
                        );
                        Err(BackendError::new("Identity backend timed out"))
                    }
                }
            }
            None => self.backend.sign_in(email, password).await,
        }
    }

    async fn report_blocked(
        &self,
        client_identity: &str,
        status: &RateLimitStatus,
    ) -> Result<(), Error> {
        let (severity, details) = if status.escalated {
            (
                Severity::High,
                format!(
                    "Client exceeded {} failed attempts and is blocked for {}",
                    self.config.max_attempts,
                    status.describe_wait()
                ),
            )
        } else {
            (
                Severity::Medium,
                format!(
                    "Blocked client attempted login, {} remaining",
                    status.describe_wait()
                ),
            )
        };

        self.audit
            .record(
                SecurityEventKind::RateLimitExceeded,
                severity,
                details,
                Some(client_identity),
            )
            .await?;
        Ok(())
    }

    async fn record_failure(&self, client_identity: &str, email: &str) -> Result<(), Error> {
        self.ledger
            .record(client_identity, false, Some(email))
            .await?;

        if self.ledger.detect_suspicious(client_identity).await? {
            self.audit
                .record(
                    SecurityEventKind::SuspiciousActivity,
                    Severity::High,
                    format!(
                        "Client tried more than {} distinct emails within the last hour",
                        self.config.suspicious_email_threshold
                    ),
                    Some(client_identity),
                )
                .await?;
        }
        Ok(())
    }
}
