use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use wm_dispatcher::Dispatcher;
use wm_domain::error::Result;
use wm_domain::{CheckConfig, CheckStatus, CheckType, QueueStatus};
use wm_storage::Monitor;

use crate::errors::to_user_friendly;
use crate::events::QueueEvent;

const POLL_INTERVAL: StdDuration = StdDuration::from_secs(2);
const INTER_ITEM_DELAY: StdDuration = StdDuration::from_secs(1);
const DEFAULT_PRUNE_INTERVAL: StdDuration = StdDuration::from_secs(3600);

/// Drains the manual-check queue strictly one item at a time across every
/// website (spec §4.3). A single async task owns the drain — sequential
/// processing falls out of the loop structure itself rather than needing
/// the original thread-based "processing slot" guard.
pub struct QueueProcessor {
    monitor: Arc<Monitor>,
    dispatcher: Arc<Dispatcher>,
    dispatch_lock: Arc<tokio::sync::Mutex<()>>,
    events: broadcast::Sender<QueueEvent>,
    queue_retention: Duration,
    history_retention: Duration,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueProcessor {
    /// `queue_retention` bounds the manual-check queue's completed/failed
    /// rows; `history_retention` bounds the append-mostly check history
    /// (spec §6, `history_retention_days`/`queue_retention_days`). Both
    /// sweeps share the one periodic task below.
    pub fn new(
        monitor: Arc<Monitor>,
        dispatcher: Arc<Dispatcher>,
        dispatch_lock: Arc<tokio::sync::Mutex<()>>,
        queue_retention: Duration,
        history_retention: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            monitor,
            dispatcher,
            dispatch_lock,
            events,
            queue_retention,
            history_retention,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Enqueue an operator-requested check. Idempotent per `(website_id,
    /// check_type)` — see `Store::enqueue`.
    pub fn enqueue(&self, website_id: &str, check_type: CheckType, requested_by: Option<String>) -> Result<String> {
        let queue_id = self.monitor.catalog.enqueue(website_id, check_type, requested_by)?;
        let _ = self.events.send(QueueEvent::Enqueued { queue_id: queue_id.clone(), website_id: website_id.to_string() });
        Ok(queue_id)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let drain = {
            let me = self.clone();
            tokio::spawn(async move { me.drain_loop().await })
        };
        let prune = {
            let me = self.clone();
            tokio::spawn(async move { me.prune_loop().await })
        };
        *self.handles.lock() = vec![drain, prune];
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = tokio::time::timeout(StdDuration::from_secs(10), handle).await;
        }
    }

    async fn drain_loop(self: Arc<Self>) {
        tracing::info!("queue: drain loop starting");
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let next = match self.monitor.catalog.dequeue_next() {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(error = %e, "queue: failed to read next item");
                    None
                }
            };

            let Some(item) = next else {
                tokio::select! {
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    _ = self.shutdown.notified() => break,
                }
                continue;
            };

            self.process_item(item).await;

            tokio::select! {
                _ = tokio::time::sleep(INTER_ITEM_DELAY) => {}
                _ = self.shutdown.notified() => break,
            }
        }
        tracing::info!("queue: drain loop exiting");
    }

    async fn process_item(&self, item: wm_domain::QueueItem) {
        let queue_id = item.id.clone();
        tracing::info!(queue_id = %queue_id, check_type = item.check_type.as_str(), website_id = %item.website_id, "queue: processing item");

        if let Err(e) = self.monitor.catalog.update_status(&queue_id, QueueStatus::Processing, None, None) {
            tracing::error!(queue_id = %queue_id, error = %e, "queue: failed to mark item processing");
            return;
        }
        self.emit_status(&queue_id, QueueStatus::Processing, "processing".to_string());

        let site = match self.monitor.catalog.get(&item.website_id) {
            Ok(site) => site,
            Err(_) => {
                let message = "Website not found. It may have been deleted after this check was queued.".to_string();
                self.fail_item(&queue_id, message);
                return;
            }
        };

        let config = CheckConfig::for_manual(item.check_type, site.flags, site.has_baselines());

        let guard = self.dispatch_lock.lock().await;
        let result = self.dispatcher.run(site, config, true).await;
        drop(guard);

        match result {
            Ok(record) if record.status == CheckStatus::Failed => {
                // `Dispatcher::run` never returns `Err` for a fatal/precondition phase
                // abort — it records the failure on the history row and still returns
                // `Ok`. The record's own `error_message` is already user-facing (e.g.
                // the exact "Please first create baselines…" precondition text) and
                // must be surfaced verbatim, not re-keyworded by `to_user_friendly`.
                let message = record
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Check failed due to an unexpected error.".to_string());
                self.fail_item(&queue_id, message);
            }
            Ok(record) => {
                let payload = serde_json::to_value(&record).ok();
                if let Err(e) = self.monitor.catalog.update_status(&queue_id, QueueStatus::Completed, None, payload) {
                    tracing::error!(queue_id = %queue_id, error = %e, "queue: failed to mark item completed");
                }
                self.emit_status(&queue_id, QueueStatus::Completed, "completed".to_string());
            }
            Err(e) => {
                let message = to_user_friendly(&e.to_string(), item.check_type);
                self.fail_item(&queue_id, message);
            }
        }
    }

    fn fail_item(&self, queue_id: &str, message: String) {
        if let Err(e) = self.monitor.catalog.update_status(queue_id, QueueStatus::Failed, Some(message.clone()), None) {
            tracing::error!(queue_id, error = %e, "queue: failed to mark item failed");
        }
        self.emit_status(queue_id, QueueStatus::Failed, message);
    }

    fn emit_status(&self, queue_id: &str, status: QueueStatus, message: String) {
        let _ = self.events.send(QueueEvent::StatusChanged { queue_id: queue_id.to_string(), status, message });
    }

    async fn prune_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(DEFAULT_PRUNE_INTERVAL) => {}
                _ = self.shutdown.notified() => break,
            }
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            match self.monitor.catalog.prune_old(self.queue_retention) {
                Ok(n) if n > 0 => tracing::info!(pruned = n, "queue: retention sweep removed old queue rows"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "queue: retention sweep failed"),
            }
            match self.monitor.history.prune_old(self.history_retention) {
                Ok(n) if n > 0 => tracing::info!(pruned = n, "queue: retention sweep removed old history rows"),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "queue: history retention sweep failed"),
            }
        }
    }

    /// Operator-recovery escape hatch, e.g. after a crash left the
    /// in-memory processing state inconsistent with the store.
    pub fn clear_active(&self) -> Result<usize> {
        self.monitor.catalog.clear_active()
    }
}
