use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    events::SecurityEvent,
    repositories::{
        AttemptRepository, EventFilter, EventRepository, RateLimitRepository, RecordFilter,
        RecordUpdate, RepositoryProvider,
    },
    storage::{LoginAttemptRecord, RateLimitRecord},
};

/// Adapter that wraps a RepositoryProvider and implements the rate limit repository
pub struct RateLimitRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> RateLimitRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> RateLimitRepository for RateLimitRepositoryAdapter<R> {
    async fn find(&self, client_identity: &str) -> Result<Option<RateLimitRecord>, Error> {
        self.provider.rate_limit().find(client_identity).await
    }

    async fn update(
        &self,
        client_identity: &str,
        apply: &mut RecordUpdate<'_>,
    ) -> Result<Option<RateLimitRecord>, Error> {
        self.provider
            .rate_limit()
            .update(client_identity, apply)
            .await
    }

    async fn remove(&self, client_identity: &str) -> Result<bool, Error> {
        self.provider.rate_limit().remove(client_identity).await
    }

    async fn clear(&self) -> Result<usize, Error> {
        self.provider.rate_limit().clear().await
    }

    async fn retain(&self, keep: &mut RecordFilter<'_>) -> Result<usize, Error> {
        self.provider.rate_limit().retain(keep).await
    }

    async fn list(&self) -> Result<Vec<(String, RateLimitRecord)>, Error> {
        self.provider.rate_limit().list().await
    }

    async fn count(&self) -> Result<usize, Error> {
        self.provider.rate_limit().count().await
    }
}

pub struct AttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AttemptRepository for AttemptRepositoryAdapter<R> {
    async fn append(&self, attempt: LoginAttemptRecord) -> Result<(), Error> {
        self.provider.attempt().append(attempt).await
    }

    async fn prune(&self, older_than: DateTime<Utc>, max_len: usize) -> Result<usize, Error> {
        self.provider.attempt().prune(older_than, max_len).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error> {
        self.provider.attempt().recent(limit).await
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<LoginAttemptRecord>, Error> {
        self.provider.attempt().since(cutoff).await
    }

    async fn count(&self) -> Result<usize, Error> {
        self.provider.attempt().count().await
    }
}

pub struct EventRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> EventRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> EventRepository for EventRepositoryAdapter<R> {
    async fn append(&self, event: SecurityEvent, max_len: usize) -> Result<usize, Error> {
        self.provider.event().append(event, max_len).await
    }

    async fn retain(&self, keep: &mut EventFilter<'_>) -> Result<usize, Error> {
        self.provider.event().retain(keep).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SecurityEvent>, Error> {
        self.provider.event().recent(limit).await
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<SecurityEvent>, Error> {
        self.provider.event().since(cutoff).await
    }

    async fn all(&self) -> Result<Vec<SecurityEvent>, Error> {
        self.provider.event().all().await
    }

    async fn count(&self) -> Result<usize, Error> {
        self.provider.event().count().await
    }
}
