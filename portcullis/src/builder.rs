//! Builder pattern for constructing Portcullis instances
//!
//! This module provides a type-safe builder for creating [`Portcullis`] instances with
//! compile-time validation that both storage and an identity backend are configured.
//!
//! # Example
//!
//! ```rust,no_run
//! use portcullis::{PortcullisBuilder, StaticIdentityBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = PortcullisBuilder::new()
//!         .with_memory_storage()
//!         .with_backend(Arc::new(StaticIdentityBackend::new()))
//!         .with_config_from_env()?
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use portcullis_core::{
    Clock, ConfigError, EventBus, EventHandler, IdentityBackend, ProtectionConfig,
    RepositoryProvider, SystemClock,
};

use crate::Portcullis;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Portcullis instance.
#[derive(Debug, thiserror::Error)]
pub enum PortcullisBuilderError {
    /// The storage backend failed its health check
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
///
/// Contains the repository provider that will be used by Portcullis.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// Marker type indicating no identity backend has been configured yet.
pub struct NoBackend;

/// Marker type indicating an identity backend has been configured.
pub struct WithBackend<B: IdentityBackend> {
    backend: Arc<B>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Portcullis`] instances.
///
/// # Type States
///
/// - [`NoStorage`] / [`WithStorage<R>`]: whether a repository provider is set
/// - [`NoBackend`] / [`WithBackend<B>`]: whether an identity backend is set
///
/// `build()` is only available once both are configured.
pub struct PortcullisBuilder<Storage, Backend> {
    storage: Storage,
    backend: Backend,
    config: ProtectionConfig,
    clock: Arc<dyn Clock>,
    alert_handlers: Vec<Arc<dyn EventHandler>>,
    start_sweeper: bool,
}

impl Default for PortcullisBuilder<NoStorage, NoBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl PortcullisBuilder<NoStorage, NoBackend> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Rate limiting: enabled, 5 attempts per 15 minutes, 30 minute lockout
    /// - Background sweep: every 5 minutes
    /// - Clock: system time
    /// - Alert handlers: none
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            backend: NoBackend,
            config: ProtectionConfig::default(),
            clock: Arc::new(SystemClock),
            alert_handlers: Vec::new(),
            start_sweeper: true,
        }
    }
}

// ============================================================================
// Storage Configuration Methods (NoStorage -> WithStorage)
// ============================================================================

impl<Backend> PortcullisBuilder<NoStorage, Backend> {
    /// Use an existing repository provider.
    pub fn with_storage<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> PortcullisBuilder<WithStorage<R>, Backend> {
        PortcullisBuilder {
            storage: WithStorage { repositories },
            backend: self.backend,
            config: self.config,
            clock: self.clock,
            alert_handlers: self.alert_handlers,
            start_sweeper: self.start_sweeper,
        }
    }

    /// Keep all state in process memory.
    #[cfg(feature = "memory")]
    pub fn with_memory_storage(
        self,
    ) -> PortcullisBuilder<WithStorage<crate::MemoryRepositoryProvider>, Backend> {
        self.with_storage(Arc::new(crate::MemoryRepositoryProvider::new()))
    }
}

// ============================================================================
// Backend Configuration Methods (NoBackend -> WithBackend)
// ============================================================================

impl<Storage> PortcullisBuilder<Storage, NoBackend> {
    /// Set the identity backend that verifies credentials.
    pub fn with_backend<B: IdentityBackend>(
        self,
        backend: Arc<B>,
    ) -> PortcullisBuilder<Storage, WithBackend<B>> {
        PortcullisBuilder {
            storage: self.storage,
            backend: WithBackend { backend },
            config: self.config,
            clock: self.clock,
            alert_handlers: self.alert_handlers,
            start_sweeper: self.start_sweeper,
        }
    }
}

// ============================================================================
// Configuration Methods (available in every state)
// ============================================================================

impl<Storage, Backend> PortcullisBuilder<Storage, Backend> {
    /// Replace the whole protection configuration.
    pub fn with_config(mut self, config: ProtectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the protection configuration from `PORTCULLIS_*` variables.
    ///
    /// See [`ProtectionConfig::from_env`] for the recognised variables.
    pub fn with_config_from_env(mut self) -> Result<Self, PortcullisBuilderError> {
        self.config = ProtectionConfig::from_env()?;
        Ok(self)
    }

    /// Set the time source. Tests use a [`ManualClock`](crate::ManualClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an operator sink for high and critical security events.
    pub fn with_alert_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.alert_handlers.push(handler);
        self
    }

    /// Bound the identity backend call. `None` waits indefinitely.
    ///
    /// Default: 10 seconds
    pub fn with_backend_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.backend_timeout = timeout;
        self
    }

    /// Roles that qualify a principal for access.
    ///
    /// Default: `["admin"]`
    pub fn with_elevated_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.elevated_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether `build()` starts the background sweep task.
    ///
    /// Default: true. Without it, call [`Portcullis::sweep_now`] yourself.
    pub fn start_sweeper(mut self, start: bool) -> Self {
        self.start_sweeper = start;
        self
    }
}

impl<R: RepositoryProvider, B: IdentityBackend> PortcullisBuilder<WithStorage<R>, WithBackend<B>> {
    /// Build the Portcullis instance.
    ///
    /// Validates the configuration, checks that storage is reachable,
    /// registers the alert handlers and, unless disabled, starts the sweep.
    /// Must be called inside a tokio runtime.
    pub async fn build(self) -> Result<Portcullis<R, B>, PortcullisBuilderError> {
        self.config.validate()?;

        let sweep_period = self.config.sweep_interval.to_std().map_err(|_| {
            ConfigError::InvalidValue {
                key: "sweep_interval".to_string(),
                value: self.config.sweep_interval.num_seconds().to_string(),
            }
        })?;

        self.storage
            .repositories
            .health_check()
            .await
            .map_err(|e| PortcullisBuilderError::StorageUnavailable(e.to_string()))?;

        let event_bus = EventBus::new();
        for handler in self.alert_handlers {
            event_bus.register(handler).await;
        }
        let alert_handlers = event_bus.handler_count().await;

        let mut gate = Portcullis::from_builder(
            self.storage.repositories,
            self.backend.backend,
            self.clock,
            self.config,
            event_bus,
        );

        if self.start_sweeper {
            gate.start_sweeper(sweep_period);
        }

        tracing::info!(
            enabled = gate.config().enabled,
            max_attempts = gate.config().max_attempts,
            sweeping = gate.is_sweeping(),
            alert_handlers = alert_handlers,
            "Portcullis ready"
        );

        Ok(gate)
    }
}
