use std::sync::Arc;

use wm_domain::config::Config;
use wm_queue::QueueProcessor;
use wm_scheduler::SchedulerCore;
use wm_storage::Monitor;

/// Everything a running instance needs, wired together once at startup
/// (spec §2.1). Grouped by concern, following the teacher's `AppState`
/// convention.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub monitor: Arc<Monitor>,
    pub scheduler: Arc<SchedulerCore>,
    pub queue: Arc<QueueProcessor>,
}
