//! In-process implementation of the audit log repository.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::{
    Error,
    error::utilities::LockResultExt,
    events::SecurityEvent,
    repositories::{EventFilter, EventRepository},
};

const COLLECTION: &str = "security_events";

/// Security events in arrival order behind a single mutex.
#[derive(Debug, Default)]
pub struct MemoryEventRepository {
    events: Mutex<VecDeque<SecurityEvent>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn count_checked(&self) -> Result<usize, Error> {
        Ok(self.events.lock().map_poisoned(COLLECTION)?.len())
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn append(&self, event: SecurityEvent, max_len: usize) -> Result<usize, Error> {
        let mut events = self.events.lock().map_poisoned(COLLECTION)?;
        events.push_back(event);

        let mut evicted = 0;
        while events.len() > max_len {
            events.pop_front();
            evicted += 1;
        }
        Ok(evicted)
    }

    async fn retain(&self, keep: &mut EventFilter<'_>) -> Result<usize, Error> {
        let mut events = self.events.lock().map_poisoned(COLLECTION)?;
        let before = events.len();
        events.retain(|event| keep(event));
        Ok(before - events.len())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error> {
        let events = self.events.lock().map_poisoned(COLLECTION)?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SecurityEvent>, Error> {
        let events = self.events.lock().map_poisoned(COLLECTION)?;
        Ok(events
            .iter()
            .filter(|event| event.timestamp >= cutoff)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<SecurityEvent>, Error> {
        let events = self.events.lock().map_poisoned(COLLECTION)?;
        Ok(events.iter().cloned().collect())
    }

    async fn count(&self) -> Result<usize, Error> {
        self.count_checked()
    }
}
