//! Repository traits for the guard's state
//!
//! This module defines the repository interfaces that services use to interact with storage.
//! These traits provide a clean abstraction over the underlying storage implementation.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each collection
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus a health check
//!
//! Every collection is expected to sit behind a single lock (or an equivalent
//! such as a sharded map) so that each operation is atomic on its own.

pub mod adapter;
pub mod attempt;
pub mod event;
pub mod rate_limit;

pub use adapter::{AttemptRepositoryAdapter, EventRepositoryAdapter, RateLimitRepositoryAdapter};
pub use attempt::AttemptRepository;
pub use event::{EventFilter, EventRepository};
pub use rate_limit::{RateLimitRepository, RecordFilter, RecordUpdate};

use async_trait::async_trait;

use crate::Error;

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for rate limit repository access.
pub trait RateLimitRepositoryProvider: Send + Sync + 'static {
    /// The rate limit repository implementation type
    type RateLimitRepo: RateLimitRepository;

    /// Get the rate limit repository
    fn rate_limit(&self) -> &Self::RateLimitRepo;
}

/// Provider trait for attempt ledger access.
pub trait AttemptRepositoryProvider: Send + Sync + 'static {
    /// The attempt repository implementation type
    type AttemptRepo: AttemptRepository;

    /// Get the attempt repository
    fn attempt(&self) -> &Self::AttemptRepo;
}

/// Provider trait for audit log access.
pub trait EventRepositoryProvider: Send + Sync + 'static {
    /// The event repository implementation type
    type EventRepo: EventRepository;

    /// Get the event repository
    fn event(&self) -> &Self::EventRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// # Implementing a Custom Storage Backend
///
/// 1. Implement each individual `*Repository` trait for your backend
/// 2. Implement each individual `*RepositoryProvider` trait
/// 3. Implement the `RepositoryProvider` trait with `health_check()`
///
/// # Example
///
/// ```rust,ignore
/// use portcullis_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl RateLimitRepositoryProvider for MyStorage {
///     type RateLimitRepo = MyRateLimitRepository;
///     fn rate_limit(&self) -> &Self::RateLimitRepo { &self.rate_limits }
/// }
///
/// // ... implement other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    RateLimitRepositoryProvider + AttemptRepositoryProvider + EventRepositoryProvider
{
    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
