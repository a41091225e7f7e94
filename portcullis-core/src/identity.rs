//! The seam to the external identity provider that checks credentials.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An authenticated account as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the principal holds at least one of `roles`.
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.roles
            .iter()
            .any(|held| roles.iter().any(|wanted| held == wanted.as_ref()))
    }
}

/// Failure reported by an identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Credential verification delegated to an external provider.
///
/// `sign_out` is used to revoke a session the backend opened for a
/// principal that is then refused access.
#[async_trait]
pub trait IdentityBackend: Send + Sync + 'static {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}
