pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Access denied: {0}")]
    Access(#[from] AccessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why an authentication attempt was turned away.
///
/// Every variant maps to a stable snake_case reason code through
/// [`AccessError::reason`], which is what callers should surface.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Input contains a blocked pattern")]
    InvalidInput,

    #[error("Invalid email format")]
    InvalidEmailFormat,

    #[error("Credentials do not meet strength requirements: {}", errors.join(", "))]
    WeakCredentials { errors: Vec<String> },

    #[error("Too many failed attempts, try again in {wait}")]
    RateLimited { retry_after_secs: i64, wait: String },

    #[error("Identity backend rejected the sign-in: {0}")]
    BackendFailure(String),

    #[error("Account lacks the required role")]
    InsufficientPrivilege,
}

impl AccessError {
    /// Stable reason code for this denial.
    pub fn reason(&self) -> &'static str {
        match self {
            AccessError::InvalidInput => "invalid_input",
            AccessError::InvalidEmailFormat => "invalid_email",
            AccessError::WeakCredentials { .. } => "weak_credentials",
            AccessError::RateLimited { .. } => "rate_limited",
            AccessError::BackendFailure(_) => "backend_failure",
            AccessError::InsufficientPrivilege => "insufficient_privilege",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event handler error: {0}")]
    HandlerError(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl Error {
    /// Reason code for an access denial, or `None` for infrastructure errors.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Error::Access(err) => Some(err.reason()),
            _ => None,
        }
    }

    pub fn is_access_error(&self) -> bool {
        matches!(self, Error::Access(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Access(AccessError::RateLimited { .. }))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}
