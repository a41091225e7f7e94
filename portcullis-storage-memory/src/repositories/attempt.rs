//! In-process implementation of the attempt ledger repository.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::{
    Error, error::utilities::LockResultExt, repositories::AttemptRepository,
    storage::LoginAttemptRecord,
};

const COLLECTION: &str = "login_attempts";

/// Login attempts in arrival order behind a single mutex.
#[derive(Debug, Default)]
pub struct MemoryAttemptRepository {
    attempts: Mutex<VecDeque<LoginAttemptRecord>>,
}

impl MemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn count_checked(&self) -> Result<usize, Error> {
        Ok(self.attempts.lock().map_poisoned(COLLECTION)?.len())
    }
}

#[async_trait]
impl AttemptRepository for MemoryAttemptRepository {
    async fn append(&self, attempt: LoginAttemptRecord) -> Result<(), Error> {
        self.attempts
            .lock()
            .map_poisoned(COLLECTION)?
            .push_back(attempt);
        Ok(())
    }

    async fn prune(&self, older_than: DateTime<Utc>, max_len: usize) -> Result<usize, Error> {
        let mut attempts = self.attempts.lock().map_poisoned(COLLECTION)?;
        let before = attempts.len();

        // Callers stamp attempts before taking the lock, so arrival order is
        // only roughly chronological.
        attempts.retain(|attempt| attempt.timestamp >= older_than);
        while attempts.len() > max_len {
            attempts.pop_front();
        }

        Ok(before - attempts.len())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error> {
        let attempts = self.attempts.lock().map_poisoned(COLLECTION)?;
        Ok(attempts.iter().rev().take(limit).cloned().collect())
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<LoginAttemptRecord>, Error> {
        let attempts = self.attempts.lock().map_poisoned(COLLECTION)?;
        Ok(attempts
            .iter()
            .filter(|attempt| attempt.timestamp >= cutoff)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, Error> {
        self.count_checked()
    }
}
