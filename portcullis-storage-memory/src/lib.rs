//! In-process storage for portcullis.
//!
//! State lives only as long as the process: a restart forgets every lockout,
//! attempt and audit event.

pub mod repositories;

pub use repositories::{
    MemoryAttemptRepository, MemoryEventRepository, MemoryRateLimitRepository,
    MemoryRepositoryProvider,
};
