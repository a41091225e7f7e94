//! Repository trait for the security audit log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, events::SecurityEvent};

/// Predicate used by [`EventRepository::retain`].
pub type EventFilter<'a> = dyn FnMut(&SecurityEvent) -> bool + Send + 'a;

/// Bounded log of security events in arrival order.
#[async_trait]
pub trait EventRepository: Send + Sync + 'static {
    /// Append an event, evicting the oldest ones beyond `max_len`.
    ///
    /// # Returns
    ///
    /// The number of events evicted.
    async fn append(&self, event: SecurityEvent, max_len: usize) -> Result<usize, Error>;

    /// Keep only the events for which `keep` returns `true`.
    ///
    /// # Returns
    ///
    /// The number of events deleted.
    async fn retain(&self, keep: &mut EventFilter<'_>) -> Result<usize, Error>;

    /// Up to `limit` events, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error>;

    /// Every event at or after `cutoff`, oldest first.
    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SecurityEvent>, Error>;

    /// Every retained event, oldest first.
    async fn all(&self) -> Result<Vec<SecurityEvent>, Error>;

    async fn count(&self) -> Result<usize, Error>;
}
