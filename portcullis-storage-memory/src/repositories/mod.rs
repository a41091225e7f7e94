//! Repository implementations backed by in-process collections

pub mod attempt;
pub mod event;
pub mod rate_limit;

pub use attempt::MemoryAttemptRepository;
pub use event::MemoryEventRepository;
pub use rate_limit::MemoryRateLimitRepository;

use async_trait::async_trait;
use portcullis_core::{
    Error,
    repositories::{
        AttemptRepositoryProvider, EventRepositoryProvider, RateLimitRepositoryProvider,
        RepositoryProvider,
    },
};
use std::sync::Arc;

/// Repository provider implementation for in-process storage
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
#[derive(Default)]
pub struct MemoryRepositoryProvider {
    rate_limit: Arc<MemoryRateLimitRepository>,
    attempt: Arc<MemoryAttemptRepository>,
    event: Arc<MemoryEventRepository>,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitRepositoryProvider for MemoryRepositoryProvider {
    type RateLimitRepo = MemoryRateLimitRepository;

    fn rate_limit(&self) -> &Self::RateLimitRepo {
        &self.rate_limit
    }
}

impl AttemptRepositoryProvider for MemoryRepositoryProvider {
    type AttemptRepo = MemoryAttemptRepository;

    fn attempt(&self) -> &Self::AttemptRepo {
        &self.attempt
    }
}

impl EventRepositoryProvider for MemoryRepositoryProvider {
    type EventRepo = MemoryEventRepository;

    fn event(&self) -> &Self::EventRepo {
        &self.event
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn health_check(&self) -> Result<(), Error> {
        // Touch every lock so a poisoned collection surfaces here.
        self.attempt.count_checked()?;
        self.event.count_checked()?;
        Ok(())
    }
}
