use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::EventError;

/// What a [`SecurityEvent`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    LoginAttempt,
    XssAttempt,
    RateLimitExceeded,
    SuspiciousActivity,
    AdminAccess,
    SecurityViolation,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::LoginAttempt => "login_attempt",
            SecurityEventKind::XssAttempt => "xss_attempt",
            SecurityEventKind::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEventKind::SuspiciousActivity => "suspicious_activity",
            SecurityEventKind::AdminAccess => "admin_access",
            SecurityEventKind::SecurityViolation => "security_violation",
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical events are forwarded to the operator sink.
    pub fn requires_alert(&self) -> bool {
        *self >= Severity::High
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in the security audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub kind: SecurityEventKind,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_identity: Option<String>,
    pub severity: Severity,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        details: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp,
            details: details.into(),
            client_identity: None,
            severity,
        }
    }

    pub fn with_client(mut self, client_identity: impl Into<String>) -> Self {
        self.client_identity = Some(client_identity.into());
        self
    }
}

/// A trait for handling security events forwarded by the event bus
///
/// Implementors of this trait are operator sinks: pagers, chat webhooks,
/// log shippers. They receive every high and critical event the audit log
/// records.
///
/// # Examples
///
/// ```
/// # use portcullis_core::events::{EventHandler, SecurityEvent};
/// # use portcullis_core::error::EventError;
/// # use async_trait::async_trait;
/// struct MyHandler;
///
/// #[async_trait]
/// impl EventHandler for MyHandler {
///     async fn handle_event(&self, event: &SecurityEvent) -> Result<(), EventError> {
///         println!("{}: {}", event.kind, event.details);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &SecurityEvent) -> Result<(), EventError>;
}

/// Event bus that fans security events out to registered handlers
///
/// Delivery through [`EventBus::dispatch`] is fire-and-forget: the handlers
/// run on a spawned task and their failures are only logged.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus
    ///
    /// # Examples
    ///
    /// ```
    /// # use portcullis_core::events::EventBus;
    /// let event_bus = EventBus::new();
    /// ```
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Number of registered handlers
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Deliver an event in the background without waiting on the handlers
    ///
    /// Every handler is tried even when an earlier one fails. Outside a tokio
    /// runtime the event is dropped with a warning.
    pub fn dispatch(&self, event: SecurityEvent) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    event_id = %event.id,
                    kind = %event.kind,
                    "No async runtime available, security alert not delivered"
                );
                return;
            }
        };

        let handlers = self.handlers.clone();
        handle.spawn(async move {
            for handler in handlers.read().await.iter() {
                if let Err(e) = handler.handle_event(&event).await {
                    tracing::warn!(
                        error = %e,
                        event_id = %event.id,
                        kind = %event.kind,
                        "Security event handler failed"
                    );
                }
            }
        });
    }
}
