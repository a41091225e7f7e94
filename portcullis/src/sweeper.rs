//! Periodic removal of expired guard state.

use std::sync::Arc;

use portcullis_core::{
    Error, RepositoryProvider,
    repositories::{AttemptRepositoryAdapter, EventRepositoryAdapter, RateLimitRepositoryAdapter},
    services::{AuditLogService, LedgerService, RateLimitService},
};
use tokio::{sync::watch, task::JoinHandle};

use crate::metrics::SweepReport;

pub(crate) type RateLimiter<R> = RateLimitService<RateLimitRepositoryAdapter<R>>;
pub(crate) type AuditLog<R> = AuditLogService<EventRepositoryAdapter<R>>;
pub(crate) type Ledger<R> = LedgerService<
    AttemptRepositoryAdapter<R>,
    RateLimitRepositoryAdapter<R>,
    EventRepositoryAdapter<R>,
>;

/// The services a sweep touches.
pub(crate) struct Maintenance<R: RepositoryProvider> {
    pub(crate) rate_limit: Arc<RateLimiter<R>>,
    pub(crate) ledger: Arc<Ledger<R>>,
    pub(crate) audit: Arc<AuditLog<R>>,
}

impl<R: RepositoryProvider> Clone for Maintenance<R> {
    fn clone(&self) -> Self {
        Self {
            rate_limit: Arc::clone(&self.rate_limit),
            ledger: Arc::clone(&self.ledger),
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<R: RepositoryProvider> Maintenance<R> {
    pub(crate) async fn run(&self) -> Result<SweepReport, Error> {
        Ok(SweepReport {
            rate_limits_removed: self.rate_limit.sweep().await?,
            attempts_pruned: self.ledger.prune().await?,
            events_pruned: self.audit.prune().await?,
        })
    }
}

/// Handle to the background sweep task.
///
/// Dropping the handle drops the shutdown sender, which also ends the task.
pub(crate) struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn<R: RepositoryProvider>(
        maintenance: Maintenance<R>,
        period: std::time::Duration,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval_timer = tokio::time::interval_at(start, period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match maintenance.run().await {
                            Ok(report) if !report.is_empty() => {
                                tracing::info!(
                                    rate_limits = report.rate_limits_removed,
                                    attempts = report.attempts_pruned,
                                    events = report.events_pruned,
                                    "Swept expired security records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to sweep security records, retrying next tick"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Shutting down security sweep task");
                        break;
                    }
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Signal the task to stop and wait for it.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Security sweep task ended abnormally");
        }
    }
}
