use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use wm_dispatcher::Dispatcher;
use wm_domain::config::SchedulerConfig;
use wm_domain::error::{Error, Result};
use wm_domain::CheckConfig;
use wm_storage::{Monitor, WebsiteFilter};

use crate::lock::SchedulerLock;
use crate::state::{PersistedState, ScheduledWebsiteInfo};

/// Current status snapshot, for `doctor` and tests.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub scheduled_count: usize,
    pub consecutive_error_count: u32,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_schedule_at: Option<DateTime<Utc>>,
}

type JobMap = HashMap<String, DateTime<Utc>>;

/// Converts the Catalog Store's active websites into a live, persisted set
/// of timed jobs (spec §4.2). One worker task owns the job set; every other
/// entry point (`force_reschedule`, `remove_website`, the deletion hook)
/// only ever mutates it through the shared `Mutex`, following the teacher's
/// `ConcurrencyGuard` style of wrapping shared mutable state behind a lock
/// type suited to the access pattern.
pub struct SchedulerCore {
    monitor: Arc<Monitor>,
    dispatcher: Arc<Dispatcher>,
    config: SchedulerConfig,
    lock_path: PathBuf,
    state_path: PathBuf,
    jobs: Arc<Mutex<JobMap>>,
    state: Arc<Mutex<PersistedState>>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    lock: Mutex<Option<SchedulerLock>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Shared with the Queue Processor so scheduled and manual checks never
    /// invoke the Dispatcher concurrently (spec §7: "no two Dispatcher
    /// invocations overlap").
    dispatch_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SchedulerCore {
    pub fn new(
        monitor: Arc<Monitor>,
        dispatcher: Arc<Dispatcher>,
        config: SchedulerConfig,
        lock_path: PathBuf,
        state_path: PathBuf,
        dispatch_lock: Arc<tokio::sync::Mutex<()>>,
    ) -> Arc<Self> {
        let core = Arc::new(Self {
            monitor,
            dispatcher,
            config,
            lock_path,
            state_path,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            state: Arc::new(Mutex::new(PersistedState::default())),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            lock: Mutex::new(None),
            handle: Mutex::new(None),
            dispatch_lock,
        });

        let jobs = core.jobs.clone();
        let state = core.state.clone();
        let state_path = core.state_path.clone();
        core.monitor.catalog.on_website_deleted(move |id: &str, _url: &str| {
            jobs.lock().remove(id);
            let mut persisted = state.lock();
            persisted.scheduled_websites.remove(id);
            if let Err(e) = persisted.save(&state_path) {
                tracing::warn!(website_id = id, error = %e, "scheduler: failed to persist state after deletion hook");
            }
        });

        core
    }

    pub fn dispatch_lock(&self) -> Arc<tokio::sync::Mutex<()>> {
        self.dispatch_lock.clone()
    }

    /// Acquires the singleton lock, loads persisted state, builds the
    /// initial job set from every active website, and spawns the worker
    /// task. Fails immediately if `scheduler_enabled` is false or another
    /// live instance holds the lock.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if !self.config.scheduler_enabled {
            return Err(Error::Precondition("scheduler_enabled is false".to_string()));
        }
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let lock = SchedulerLock::acquire(&self.lock_path, StdDuration::from_secs(self.config.lock_stale_after_seconds))?;
        *self.lock.lock() = Some(lock);

        let mut state = PersistedState::load(&self.state_path)?;
        state.is_running = true;
        state.save(&self.state_path)?;
        *self.state.lock() = state;

        self.rebuild_job_set()?;

        self.running.store(true, Ordering::SeqCst);
        let me = self.clone();
        let handle = tokio::spawn(async move { me.worker_loop().await });
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Cooperative shutdown: signals the worker, waits up to 30 seconds for
    /// it to exit, then releases the lock regardless (spec §4.2, §7).
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.shutdown.notify_waiters();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(StdDuration::from_secs(30), handle).await.is_err() {
                tracing::warn!("scheduler: worker did not exit within 30s shutdown window");
            }
        }

        let mut state = self.state.lock();
        state.is_running = false;
        state.save(&self.state_path)?;
        drop(state);

        if let Some(lock) = self.lock.lock().take() {
            lock.release();
        }
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock();
        SchedulerStatus {
            is_running: self.running.load(Ordering::SeqCst),
            scheduled_count: self.jobs.lock().len(),
            consecutive_error_count: state.consecutive_error_count,
            last_error_at: state.last_error_at,
            last_schedule_at: state.last_schedule_at,
        }
    }

    /// Drops every job and rebuilds the set from the Catalog Store's
    /// currently-active websites, each due immediately at `now + cadence`.
    /// Invoked at `start()` and after `max_consecutive_errors` tick errors.
    pub fn force_reschedule(&self) -> Result<()> {
        self.rebuild_job_set()
    }

    fn rebuild_job_set(&self) -> Result<()> {
        let sites = self.monitor.catalog.list(&WebsiteFilter { active: Some(true), ..Default::default() })?;
        let now = Utc::now();

        let mut jobs = self.jobs.lock();
        jobs.clear();
        let mut state = self.state.lock();
        state.scheduled_websites.clear();
        for site in &sites {
            let scheduled_at = now + Duration::minutes(site.cadence_minutes as i64);
            jobs.insert(site.id.clone(), scheduled_at);
            state.scheduled_websites.insert(
                site.id.clone(),
                ScheduledWebsiteInfo {
                    name: site.display_name.clone(),
                    url: site.url.clone(),
                    cadence_minutes: site.cadence_minutes,
                    scheduled_at,
                },
            );
        }
        state.last_schedule_at = Some(now);
        state.save(&self.state_path)?;
        drop(state);
        drop(jobs);
        tracing::info!(job_count = sites.len(), "scheduler: job set rebuilt");
        Ok(())
    }

    /// Drops a single job, e.g. when a tick discovers the website is gone
    /// or has been deactivated. Persists immediately.
    pub fn remove_website(&self, website_id: &str) -> Result<()> {
        self.jobs.lock().remove(website_id);
        let mut state = self.state.lock();
        state.scheduled_websites.remove(website_id);
        state.save(&self.state_path)
    }

    async fn worker_loop(self: Arc<Self>) {
        tracing::info!("scheduler: worker loop starting");
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let due: Vec<String> = {
                let jobs = self.jobs.lock();
                let now = Utc::now();
                jobs.iter().filter(|(_, at)| **at <= now).map(|(id, _)| id.clone()).collect()
            };

            for website_id in due {
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.run_due_job(&website_id).await;
            }

            let sleep_for = self.next_sleep_duration();
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.shutdown.notified() => break,
            }
        }
        tracing::info!("scheduler: worker loop exiting");
    }

    fn next_sleep_duration(&self) -> StdDuration {
        let max = StdDuration::from_secs(self.config.max_sleep_seconds.max(1));
        let jobs = self.jobs.lock();
        let Some(soonest) = jobs.values().min().copied() else {
            return max;
        };
        let now = Utc::now();
        if soonest <= now {
            return StdDuration::from_millis(0);
        }
        let until = (soonest - now).to_std().unwrap_or(max);
        until.min(max)
    }

    async fn run_due_job(&self, website_id: &str) {
        let site = match self.monitor.catalog.get(website_id) {
            Ok(site) => site,
            Err(Error::NotFound(_)) => {
                tracing::info!(website_id, "scheduler: website vanished, dropping job");
                let _ = self.remove_website(website_id);
                return;
            }
            Err(e) => {
                self.record_tick_error(&e.to_string());
                return;
            }
        };

        if !site.is_active {
            tracing::info!(website_id, "scheduler: website deactivated, dropping job");
            let _ = self.remove_website(website_id);
            return;
        }

        let config = CheckConfig::for_automated(site.flags);
        let cadence = site.cadence_minutes;

        let guard = self.dispatch_lock.lock().await;
        let result = self.dispatcher.run(site, config, false).await;
        drop(guard);

        match result {
            Ok(record) => {
                tracing::info!(website_id, status = ?record.status, "scheduler: tick complete");
                self.reschedule_after_success(website_id, cadence);
                self.reset_error_count();
            }
            Err(e) => {
                tracing::error!(website_id, error = %e, "scheduler: tick failed");
                self.reschedule_after_success(website_id, cadence);
                self.record_tick_error(&e.to_string());
            }
        }
    }

    fn reschedule_after_success(&self, website_id: &str, cadence_minutes: u32) {
        let next = Utc::now() + Duration::minutes(cadence_minutes as i64);
        self.jobs.lock().insert(website_id.to_string(), next);
        let mut state = self.state.lock();
        if let Some(entry) = state.scheduled_websites.get_mut(website_id) {
            entry.scheduled_at = next;
        }
        if let Err(e) = state.save(&self.state_path) {
            tracing::warn!(website_id, error = %e, "scheduler: failed to persist reschedule");
        }
    }

    fn reset_error_count(&self) {
        let mut state = self.state.lock();
        if state.consecutive_error_count != 0 {
            state.consecutive_error_count = 0;
            let _ = state.save(&self.state_path);
        }
    }

    fn record_tick_error(&self, message: &str) {
        let should_reschedule = {
            let mut state = self.state.lock();
            state.consecutive_error_count += 1;
            state.last_error_at = Some(Utc::now());
            let _ = state.save(&self.state_path);
            tracing::error!(error = message, count = state.consecutive_error_count, "scheduler: tick error recorded");
            state.consecutive_error_count >= self.config.max_consecutive_errors
        };
        if should_reschedule {
            tracing::warn!("scheduler: max consecutive errors reached, forcing reschedule");
            if let Err(e) = self.force_reschedule() {
                tracing::error!(error = %e, "scheduler: forced reschedule itself failed");
            } else {
                self.state.lock().consecutive_error_count = 0;
                let _ = self.state.lock().save(&self.state_path);
            }
        }
    }
}
