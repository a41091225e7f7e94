//! Repository trait for per-client rate limiting state.

use async_trait::async_trait;

use crate::{Error, storage::RateLimitRecord};

/// Closure applied to a client's record inside a single critical section.
///
/// It receives the current record (if any) and returns the record to store;
/// returning `None` deletes it.
pub type RecordUpdate<'a> =
    dyn FnMut(Option<RateLimitRecord>) -> Option<RateLimitRecord> + Send + 'a;

/// Predicate used by [`RateLimitRepository::retain`].
pub type RecordFilter<'a> = dyn FnMut(&str, &RateLimitRecord) -> bool + Send + 'a;

/// Repository for rate limiting records keyed by client identity.
///
/// Implementations must apply [`RateLimitRepository::update`] atomically with
/// respect to every other operation on the same client: a read followed by a
/// write in two calls could lose a concurrent failure.
#[async_trait]
pub trait RateLimitRepository: Send + Sync + 'static {
    /// Get the record for a client, if one exists.
    async fn find(&self, client_identity: &str) -> Result<Option<RateLimitRecord>, Error>;

    /// Read-modify-write a client's record under the write lock.
    ///
    /// # Returns
    ///
    /// The record as stored after the update, or `None` if it was deleted.
    async fn update(
        &self,
        client_identity: &str,
        apply: &mut RecordUpdate<'_>,
    ) -> Result<Option<RateLimitRecord>, Error>;

    /// Delete a client's record. Returns whether one existed.
    async fn remove(&self, client_identity: &str) -> Result<bool, Error>;

    /// Delete every record. Returns the number deleted.
    async fn clear(&self) -> Result<usize, Error>;

    /// Keep only the records for which `keep` returns `true`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn retain(&self, keep: &mut RecordFilter<'_>) -> Result<usize, Error>;

    /// Snapshot of every record.
    async fn list(&self) -> Result<Vec<(String, RateLimitRecord)>, Error>;

    /// Number of tracked clients.
    async fn count(&self) -> Result<usize, Error>;
}
