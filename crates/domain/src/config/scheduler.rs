use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "d_true")]
    pub scheduler_enabled: bool,
    /// Maximum sleep between worker-loop wakeups, in seconds (spec: <= 60).
    #[serde(default = "d_60")]
    pub max_sleep_seconds: u64,
    /// Age (in seconds) after which an existing lock file is considered
    /// stale and reclaimed, regardless of the referenced process's liveness.
    #[serde(default = "d_120")]
    pub lock_stale_after_seconds: u64,
    /// Consecutive tick errors after which a full reschedule is forced.
    #[serde(default = "d_5")]
    pub max_consecutive_errors: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_enabled: true,
            max_sleep_seconds: 60,
            lock_stale_after_seconds: 120,
            max_consecutive_errors: 5,
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_60() -> u64 {
    60
}
fn d_120() -> u64 {
    120
}
fn d_5() -> u32 {
    5
}
