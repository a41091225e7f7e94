//! Core building blocks for the portcullis login guard
//!
//! This crate contains the pieces the [`portcullis`](https://docs.rs/portcullis)
//! access gate is assembled from:
//!
//! - [`threat`] and [`validation`]: stateless checks on raw input
//! - [`services`]: the rate limiter, attempt ledger and audit log
//! - [`repositories`]: the storage traits those services are written against
//! - [`identity`]: the seam to the provider that actually verifies credentials
//!
//! Storage backends depend on this crate and implement [`RepositoryProvider`].
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod threat;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ProtectionConfig;
pub use error::{AccessError, ConfigError, Error, EventError, StorageError};
pub use events::{EventBus, EventHandler, SecurityEvent, SecurityEventKind, Severity};
pub use identity::{BackendError, IdentityBackend, Principal};
pub use repositories::RepositoryProvider;
pub use services::{
    AttemptCounts, AuditLogService, LedgerService, RateLimitService, RateLimitStatus,
};
pub use storage::{LoginAttemptRecord, RateLimitRecord};
pub use threat::ThreatKind;
pub use validation::{PasswordAssessment, PasswordStrength};
