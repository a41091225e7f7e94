//! In-process implementation of the rate limit repository.

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use portcullis_core::{
    Error,
    repositories::{RateLimitRepository, RecordFilter, RecordUpdate},
    storage::RateLimitRecord,
};

/// Rate limit records in a sharded concurrent map.
///
/// Each operation holds the write lock of the shard owning the key, which
/// makes [`RateLimitRepository::update`] atomic per client.
#[derive(Debug, Default)]
pub struct MemoryRateLimitRepository {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryRateLimitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for MemoryRateLimitRepository {
    async fn find(&self, client_identity: &str) -> Result<Option<RateLimitRecord>, Error> {
        Ok(self
            .records
            .get(client_identity)
            .map(|record| record.value().clone()))
    }

    async fn update(
        &self,
        client_identity: &str,
        apply: &mut RecordUpdate<'_>,
    ) -> Result<Option<RateLimitRecord>, Error> {
        let next = match self.records.entry(client_identity.to_string()) {
            Entry::Occupied(mut entry) => match apply(Some(entry.get().clone())) {
                Some(next) => {
                    entry.insert(next.clone());
                    Some(next)
                }
                None => {
                    entry.remove();
                    None
                }
            },
            Entry::Vacant(entry) => match apply(None) {
                Some(next) => {
                    entry.insert(next.clone());
                    Some(next)
                }
                None => None,
            },
        };

        Ok(next)
    }

    async fn remove(&self, client_identity: &str) -> Result<bool, Error> {
        Ok(self.records.remove(client_identity).is_some())
    }

    async fn clear(&self) -> Result<usize, Error> {
        let mut removed = 0;
        self.records.retain(|_, _| {
            removed += 1;
            false
        });
        Ok(removed)
    }

    async fn retain(&self, keep: &mut RecordFilter<'_>) -> Result<usize, Error> {
        let mut removed = 0;
        self.records.retain(|client, record| {
            let kept = keep(client, record);
            if !kept {
                removed += 1;
            }
            kept
        });

        if removed > 0 {
            tracing::debug!(count = removed, "Removed rate limit records");
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<(String, RateLimitRecord)>, Error> {
        Ok(self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn count(&self) -> Result<usize, Error> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_creates_and_deletes() {
        let repo = MemoryRateLimitRepository::new();
        let now = Utc::now();

        let stored = repo
            .update("c1", &mut |current| {
                assert!(current.is_none());
                Some(RateLimitRecord::first_failure(now))
            })
            .await
            .unwrap();
        assert_eq!(stored.map(|r| r.attempts), Some(1));
        assert_eq!(repo.count().await.unwrap(), 1);

        let stored = repo.update("c1", &mut |_| None).await.unwrap();
        assert!(stored.is_none());
        assert!(repo.find("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_without_record_and_none_is_noop() {
        let repo = MemoryRateLimitRepository::new();
        let stored = repo.update("ghost", &mut |current| current).await.unwrap();
        assert!(stored.is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let repo = Arc::new(MemoryRateLimitRepository::new());
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.update("shared", &mut |current| {
                    Some(match current {
                        Some(mut record) => {
                            record.attempts += 1;
                            record
                        }
                        None => RateLimitRecord::first_failure(now),
                    })
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = repo.find("shared").await.unwrap().unwrap();
        assert_eq!(record.attempts, 50);
    }

    #[tokio::test]
    async fn test_retain_and_clear_report_counts() {
        let repo = MemoryRateLimitRepository::new();
        let now = Utc::now();
        for (client, age) in [("old", 60), ("new", 1), ("newer", 0)] {
            let at = now - Duration::minutes(age);
            repo.update(client, &mut |_| Some(RateLimitRecord::first_failure(at)))
                .await
                .unwrap();
        }

        let cutoff = now - Duration::minutes(30);
        let removed = repo
            .retain(&mut |_, record| record.last_attempt_at > cutoff)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.list().await.unwrap().len(), 2);

        assert!(repo.remove("new").await.unwrap());
        assert!(!repo.remove("new").await.unwrap());
        assert_eq!(repo.clear().await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
