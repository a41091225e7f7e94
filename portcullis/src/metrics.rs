//! Point-in-time summaries of the guard's state.

use serde::{Deserialize, Serialize};

/// Security dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityMetrics {
    pub attempts_last_hour: usize,
    pub failed_attempts_last_hour: usize,
    /// Counted from `login_attempt` audit events
    pub attempts_last_day: usize,
    pub active_blocks: usize,
    pub tracked_clients: usize,
    /// High and critical audit events in the last day
    pub high_severity_events_last_day: usize,
}

/// What a single sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub rate_limits_removed: usize,
    pub attempts_pruned: usize,
    pub events_pruned: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.rate_limits_removed + self.attempts_pruned + self.events_pruned
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
