//! Repository trait for the login attempt ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, storage::LoginAttemptRecord};

/// Append-only, bounded log of login attempts in arrival order.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Append an attempt at the newest end.
    async fn append(&self, attempt: LoginAttemptRecord) -> Result<(), Error>;

    /// Drop attempts older than `older_than`, then the oldest beyond `max_len`.
    ///
    /// # Returns
    ///
    /// The number of records dropped.
    async fn prune(&self, older_than: DateTime<Utc>, max_len: usize) -> Result<usize, Error>;

    /// Up to `limit` attempts, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<LoginAttemptRecord>, Error>;

    /// Every attempt at or after `cutoff`, oldest first.
    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<LoginAttemptRecord>, Error>;

    async fn count(&self) -> Result<usize, Error>;
}
