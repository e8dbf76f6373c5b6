use std::sync::Arc;

use chrono::Duration;
use wm_dispatcher::{
    host_of, Dispatcher, ImageBlurAnalyzer, LettreEmailTransport, NullPerformanceAnalyzer,
    NullScreenshotCapture, ReqwestCrawler, SnapshotLayout,
};
use wm_domain::config::Config;
use wm_domain::error::Result;
use wm_queue::QueueProcessor;
use wm_scheduler::SchedulerCore;
use wm_storage::Monitor;

use crate::state::AppState;

/// Opens the store, wires the default collaborator adapters into a
/// `Dispatcher`, and builds the `SchedulerCore` and `QueueProcessor` handles
/// sharing the one process-wide dispatch mutex (spec §5: "no two Dispatcher
/// invocations overlap"). Does not call `start()` on either — callers
/// decide whether this is a `run` (both started) or a `check`/`doctor`
/// invocation (store-only).
pub fn build_app_state(config: Arc<Config>) -> Result<AppState> {
    let monitor = Arc::new(Monitor::open(&config.storage.database_path)?);

    let snapshot_root = config.storage.snapshot_directory.clone();
    monitor.catalog.on_website_deleted(move |id: &str, url: &str| {
        let layout = SnapshotLayout::new(&snapshot_root, host_of(url), id);
        if let Err(e) = layout.remove_all() {
            tracing::warn!(website_id = id, error = %e, "bootstrap: failed to remove snapshot tree on deletion");
        }
    });

    let dispatch_lock = Arc::new(tokio::sync::Mutex::new(()));

    let dispatcher = Arc::new(Dispatcher::new(
        monitor.clone(),
        config.storage.snapshot_directory.clone(),
        Arc::new(ReqwestCrawler::new()?),
        Arc::new(NullScreenshotCapture),
        Arc::new(ImageBlurAnalyzer),
        Arc::new(NullPerformanceAnalyzer),
        Arc::new(LettreEmailTransport::new(&config.notification)?),
        config.notification.clone(),
    )?);

    let scheduler = SchedulerCore::new(
        monitor.clone(),
        dispatcher.clone(),
        config.scheduler.clone(),
        config.storage.lock_file_path.clone(),
        config.storage.scheduler_state_path.clone(),
        dispatch_lock.clone(),
    );

    let queue = QueueProcessor::new(
        monitor.clone(),
        dispatcher,
        dispatch_lock,
        Duration::days(config.retention.queue_retention_days as i64),
        Duration::days(config.retention.history_retention_days as i64),
    );

    Ok(AppState { config, monitor, scheduler, queue })
}
