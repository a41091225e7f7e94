use std::sync::{LockResult, MutexGuard};

use crate::{Error, error::StorageError};

/// Extension trait for lock results to simplify poisoned-lock mapping
///
/// Storage backends guard their collections with a mutex. A poisoned mutex
/// means another thread panicked mid-update, and the collection may no longer
/// hold its invariants, so it is reported as a storage error instead of being
/// silently recovered.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use portcullis_core::error::utilities::LockResultExt;
///
/// let events = Mutex::new(Vec::<u32>::new());
/// let mut guard = events.lock().map_poisoned("events").unwrap();
/// guard.push(1);
/// ```
pub trait LockResultExt<'a, T> {
    /// Convert a poisoned lock into a storage error naming the collection
    fn map_poisoned(self, collection: &str) -> Result<MutexGuard<'a, T>, Error>;
}

impl<'a, T> LockResultExt<'a, T> for LockResult<MutexGuard<'a, T>> {
    fn map_poisoned(self, collection: &str) -> Result<MutexGuard<'a, T>, Error> {
        self.map_err(|_| Error::Storage(StorageError::Poisoned(collection.to_string())))
    }
}
