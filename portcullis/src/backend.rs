//! A fixed-account identity backend for demos and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use portcullis_core::{BackendError, IdentityBackend, Principal};

struct Account {
    password: String,
    principal: Principal,
}

/// Identity backend with a fixed set of accounts held in memory.
///
/// # Example
///
/// ```rust
/// use portcullis::StaticIdentityBackend;
///
/// let backend = StaticIdentityBackend::new()
///     .with_account("owner@example.com", "Sup3r$ecretPass", &["admin"])
///     .with_account("guest@example.com", "Gu3st!Password", &[]);
/// ```
#[derive(Default)]
pub struct StaticIdentityBackend {
    accounts: HashMap<String, Account>,
    latency: Option<std::time::Duration>,
    sign_ins: AtomicUsize,
    sign_outs: AtomicUsize,
}

impl StaticIdentityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, email: &str, password: &str, roles: &[&str]) -> Self {
        let principal = roles.iter().fold(
            Principal::new(format!("user-{}", self.accounts.len() + 1), email),
            |principal, role| principal.with_role(*role),
        );
        self.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                principal,
            },
        );
        self
    }

    /// Delay every sign-in, to exercise backend timeouts.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of sign-in calls received.
    pub fn sign_in_count(&self) -> usize {
        self.sign_ins.load(Ordering::SeqCst)
    }

    /// Number of sign-out calls received.
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityBackend for StaticIdentityBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, BackendError> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.accounts.get(email) {
            Some(account) if account.password == password => Ok(account.principal.clone()),
            _ => Err(BackendError::new("Invalid login credentials")),
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
