//! Bounded, severity-tagged security audit log.
//!
//! Every logged event is kept in the event repository (oldest evicted first
//! beyond the configured cap) and mirrored as a `tracing` event whose level
//! follows its severity. High and critical events are also handed to the
//! [`EventBus`] without waiting on the operator sinks.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    clock::{self, Clock},
    config::ProtectionConfig,
    events::{EventBus, SecurityEvent, SecurityEventKind, Severity},
    repositories::EventRepository,
};

/// Default number of events returned by [`AuditLogService::recent`].
pub const DEFAULT_RECENT_EVENTS: usize = 100;

pub struct AuditLogService<R: EventRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    config: ProtectionConfig,
    event_bus: EventBus,
}

impl<R: EventRepository> AuditLogService<R> {
    pub fn new(
        repository: Arc<R>,
        clock: Arc<dyn Clock>,
        config: ProtectionConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            repository,
            clock,
            config,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Append an event and alert on it if it is severe enough.
    pub async fn log(&self, event: SecurityEvent) -> Result<(), Error> {
        trace_event(&event);

        let alert = event.severity.requires_alert().then(|| event.clone());
        let evicted = self
            .repository
            .append(event, self.config.max_events)
            .await?;
        if evicted > 0 {
            tracing::debug!(count = evicted, "Evicted oldest security events");
        }

        if let Some(event) = alert {
            self.event_bus.dispatch(event);
        }

        Ok(())
    }

    /// Build an event stamped with the current time and log it.
    pub async fn record(
        &self,
        kind: SecurityEventKind,
        severity: Severity,
        details: impl Into<String>,
        client_identity: Option<&str>,
    ) -> Result<SecurityEvent, Error> {
        let mut event = SecurityEvent::new(kind, severity, details, self.clock.now());
        if let Some(client) = client_identity {
            event = event.with_client(client);
        }

        self.log(event.clone()).await?;
        Ok(event)
    }

    /// Up to `limit` events, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error> {
        self.repository.recent(limit).await
    }

    /// Drop events past their retention.
    ///
    /// Any event older than the general retention goes; `login_attempt`
    /// events go sooner, after the login retention.
    pub async fn prune(&self) -> Result<usize, Error> {
        let now = self.clock.now();
        let retain_after = clock::saturating_sub(now, self.config.event_retention);
        let retain_logins_after = clock::saturating_sub(now, self.config.login_event_retention);

        self.repository
            .retain(&mut |event| {
                if event.timestamp < retain_after {
                    return false;
                }
                !(event.kind == SecurityEventKind::LoginAttempt
                    && event.timestamp < retain_logins_after)
            })
            .await
    }

    /// Count events at or after `cutoff`, optionally filtered by kind and
    /// minimum severity.
    pub async fn count_since(
        &self,
        kind: Option<SecurityEventKind>,
        min_severity: Option<Severity>,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, Error> {
        let events = self.repository.since(cutoff).await?;
        Ok(events
            .iter()
            .filter(|event| kind.is_none_or(|kind| event.kind == kind))
            .filter(|event| min_severity.is_none_or(|min| event.severity >= min))
            .count())
    }

    /// Every retained event as a JSON array, oldest first.
    pub async fn export_json(&self) -> Result<String, Error> {
        let events = self.repository.all().await?;
        Ok(serde_json::to_string_pretty(&events)?)
    }

    pub async fn len(&self) -> Result<usize, Error> {
        self.repository.count().await
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

fn trace_event(event: &SecurityEvent) {
    let client = event.client_identity.as_deref().unwrap_or("-");
    match event.severity {
        Severity::Low => tracing::debug!(
            kind = %event.kind,
            client = %client,
            details = %event.details,
            "Security event"
        ),
        Severity::Medium => tracing::info!(
            kind = %event.kind,
            client = %client,
            details = %event.details,
            "Security event"
        ),
        Severity::High => tracing::warn!(
            kind = %event.kind,
            client = %client,
            details = %event.details,
            "Security event"
        ),
        Severity::Critical => tracing::error!(
            kind = %event.kind,
            client = %client,
            details = %event.details,
            "Security event"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::EventError;
    use crate::events::EventHandler;
    use crate::services::mocks::MockEventRepository;
    use async_trait::async_trait;
    use chrono::Duration;
    use tokio::sync::mpsc;

    struct ChannelHandler(mpsc::UnboundedSender<SecurityEvent>);

    #[async_trait]
    impl EventHandler for ChannelHandler {
        async fn handle_event(&self, event: &SecurityEvent) -> Result<(), EventError> {
            self.0
                .send(event.clone())
                .map_err(|e| EventError::HandlerError(e.to_string()))
        }
    }

    fn service_with(
        config: ProtectionConfig,
    ) -> (AuditLogService<MockEventRepository>, ManualClock) {
        let clock = ManualClock::starting_now();
        let service = AuditLogService::new(
            Arc::new(MockEventRepository::default()),
            Arc::new(clock.clone()),
            config,
            EventBus::new(),
        );
        (service, clock)
    }

    fn service() -> (AuditLogService<MockEventRepository>, ManualClock) {
        service_with(ProtectionConfig::default())
    }

    #[tokio::test]
    async fn test_record_and_recent_newest_first() {
        let (service, clock) = service();
        service
            .record(SecurityEventKind::LoginAttempt, Severity::Low, "first", Some("a"))
            .await
            .unwrap();
        clock.advance(Duration::seconds(1));
        service
            .record(SecurityEventKind::AdminAccess, Severity::Low, "second", None)
            .await
            .unwrap();

        let recent = service.recent(DEFAULT_RECENT_EVENTS).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details, "second");
        assert_eq!(recent[1].client_identity.as_deref(), Some("a"));

        assert_eq!(service.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_log_is_capped_fifo() {
        let (service, _) = service();
        for i in 0..1005 {
            service
                .record(
                    SecurityEventKind::LoginAttempt,
                    Severity::Low,
                    format!("event {i}"),
                    None,
                )
                .await
                .unwrap();
        }

        assert_eq!(service.len().await.unwrap(), 1000);
        let all = service.recent(usize::MAX).await.unwrap();
        assert_eq!(all[0].details, "event 1004");
        assert_eq!(all[999].details, "event 5");
    }

    #[tokio::test]
    async fn test_high_severity_reaches_sink() {
        let (service, _) = service();
        let (tx, mut rx) = mpsc::unbounded_channel();
        service
            .event_bus()
            .register(Arc::new(ChannelHandler(tx)))
            .await;

        service
            .record(SecurityEventKind::LoginAttempt, Severity::Medium, "quiet", None)
            .await
            .unwrap();
        let loud = service
            .record(SecurityEventKind::XssAttempt, Severity::High, "loud", Some("x"))
            .await
            .unwrap();

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.id, loud.id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_prune_by_age_and_kind() {
        let (service, clock) = service();
        service
            .record(SecurityEventKind::AdminAccess, Severity::Low, "old admin", None)
            .await
            .unwrap();
        service
            .record(SecurityEventKind::LoginAttempt, Severity::Low, "old login", None)
            .await
            .unwrap();

        clock.advance(Duration::hours(25));
        service
            .record(SecurityEventKind::LoginAttempt, Severity::Low, "new login", None)
            .await
            .unwrap();

        assert_eq!(service.prune().await.unwrap(), 1);
        let remaining: Vec<_> = service
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.details)
            .collect();
        assert_eq!(remaining, vec!["new login", "old admin"]);

        clock.advance(Duration::days(7));
        assert_eq!(service.prune().await.unwrap(), 2);
        assert!(service.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_count_since_filters() {
        let (service, clock) = service();
        let start = clock.now();
        service
            .record(SecurityEventKind::LoginAttempt, Severity::Medium, "a", None)
            .await
            .unwrap();
        service
            .record(SecurityEventKind::XssAttempt, Severity::High, "b", None)
            .await
            .unwrap();
        service
            .record(SecurityEventKind::SecurityViolation, Severity::Critical, "c", None)
            .await
            .unwrap();

        assert_eq!(service.count_since(None, None, start).await.unwrap(), 3);
        assert_eq!(
            service
                .count_since(Some(SecurityEventKind::LoginAttempt), None, start)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            service
                .count_since(None, Some(Severity::High), start)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            service
                .count_since(None, None, start + Duration::seconds(1))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_export_json() {
        let (service, _) = service();
        service
            .record(SecurityEventKind::RateLimitExceeded, Severity::High, "blocked", Some("c"))
            .await
            .unwrap();

        let json = service.export_json().await.unwrap();
        let parsed: Vec<SecurityEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, SecurityEventKind::RateLimitExceeded);
        assert!(json.contains("\"rate_limit_exceeded\""));
    }
}
