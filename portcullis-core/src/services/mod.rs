//! Service layer for the guard's stateful components
//!
//! Each service owns one concern and reaches its state only through a
//! repository trait, so the same logic runs against any storage backend.

pub mod audit;
pub mod ledger;
pub mod rate_limit;

pub use audit::AuditLogService;
pub use ledger::{AttemptCounts, LedgerService};
pub use rate_limit::{RateLimitService, RateLimitStatus};

#[cfg(test)]
pub(crate) mod mocks {
    //! Minimal in-process repositories for service tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::{
        Error,
        error::utilities::LockResultExt,
        events::SecurityEvent,
        repositories::{
            AttemptRepository, EventFilter, EventRepository, RateLimitRepository, RecordFilter,
            RecordUpdate,
        },
        storage::{LoginAttemptRecord, RateLimitRecord},
    };

    #[derive(Default)]
    pub struct MockRateLimitRepository {
        records: Mutex<HashMap<String, RateLimitRecord>>,
    }

    #[async_trait]
    impl RateLimitRepository for MockRateLimitRepository {
        async fn find(&self, client_identity: &str) -> Result<Option<RateLimitRecord>, Error> {
            let records = self.records.lock().map_poisoned("rate_limits")?;
            Ok(records.get(client_identity).cloned())
        }

        async fn update(
            &self,
            client_identity: &str,
            apply: &mut RecordUpdate<'_>,
        ) -> Result<Option<RateLimitRecord>, Error> {
            let mut records = self.records.lock().map_poisoned("rate_limits")?;
            let current = records.remove(client_identity);
            let next = apply(current);
            if let Some(record) = &next {
                records.insert(client_identity.to_string(), record.clone());
            }
            Ok(next)
        }

        async fn remove(&self, client_identity: &str) -> Result<bool, Error> {
            let mut records = self.records.lock().map_poisoned("rate_limits")?;
            Ok(records.remove(client_identity).is_some())
        }

        async fn clear(&self) -> Result<usize, Error> {
            let mut records = self.records.lock().map_poisoned("rate_limits")?;
            let count = records.len();
            records.clear();
            Ok(count)
        }

        async fn retain(&self, keep: &mut RecordFilter<'_>) -> Result<usize, Error> {
            let mut records = self.records.lock().map_poisoned("rate_limits")?;
            let before = records.len();
            records.retain(|client, record| keep(client, record));
            Ok(before - records.len())
        }

        async fn list(&self) -> Result<Vec<(String, RateLimitRecord)>, Error> {
            let records = self.records.lock().map_poisoned("rate_limits")?;
            Ok(records
                .iter()
                .map(|(client, record)| (client.clone(), record.clone()))
                .collect())
        }

        async fn count(&self) -> Result<usize, Error> {
            Ok(self.records.lock().map_poisoned("rate_limits")?.len())
        }
    }

    #[derive(Default)]
    pub struct MockAttemptRepository {
        attempts: Mutex<VecDeque<LoginAttemptRecord>>,
    }

    #[async_trait]
    impl AttemptRepository for MockAttemptRepository {
        async fn append(&self, attempt: LoginAttemptRecord) -> Result<(), Error> {
            self.attempts
                .lock()
                .map_poisoned("attempts")?
                .push_back(attempt);
            Ok(())
        }

        async fn prune(&self, older_than: DateTime<Utc>, max_len: usize) -> Result<usize, Error> {
            let mut attempts = self.attempts.lock().map_poisoned("attempts")?;
            let before = attempts.len();
            attempts.retain(|attempt| attempt.timestamp >= older_than);
            while attempts.len() > max_len {
                attempts.pop_front();
            }
            Ok(before - attempts.len())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error> {
            let attempts = self.attempts.lock().map_poisoned("attempts")?;
            Ok(attempts.iter().rev().take(limit).cloned().collect())
        }

        async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<LoginAttemptRecord>, Error> {
            let attempts = self.attempts.lock().map_poisoned("attempts")?;
            Ok(attempts
                .iter()
                .filter(|attempt| attempt.timestamp >= cutoff)
                .cloned()
                .collect())
        }

        async fn count(&self) -> Result<usize, Error> {
            Ok(self.attempts.lock().map_poisoned("attempts")?.len())
        }
    }

    #[derive(Default)]
    pub struct MockEventRepository {
        events: Mutex<VecDeque<SecurityEvent>>,
    }

    #[async_trait]
    impl EventRepository for MockEventRepository {
        async fn append(&self, event: SecurityEvent, max_len: usize) -> Result<usize, Error> {
            let mut events = self.events.lock().map_poisoned("events")?;
            events.push_back(event);
            let mut evicted = 0;
            while events.len() > max_len {
                events.pop_front();
                evicted += 1;
            }
            Ok(evicted)
        }

        async fn retain(&self, keep: &mut EventFilter<'_>) -> Result<usize, Error> {
            let mut events = self.events.lock().map_poisoned("events")?;
            let before = events.len();
            events.retain(|event| keep(event));
            Ok(before - events.len())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error> {
            let events = self.events.lock().map_poisoned("events")?;
            Ok(events.iter().rev().take(limit).cloned().collect())
        }

        async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SecurityEvent>, Error> {
            let events = self.events.lock().map_poisoned("events")?;
            Ok(events
                .iter()
                .filter(|event| event.timestamp >= cutoff)
                .cloned()
                .collect())
        }

        async fn all(&self) -> Result<Vec<SecurityEvent>, Error> {
            Ok(self
                .events
                .lock()
                .map_poisoned("events")?
                .iter()
                .cloned()
                .collect())
        }

        async fn count(&self) -> Result<usize, Error> {
            Ok(self.events.lock().map_poisoned("events")?.len())
        }
    }
}
