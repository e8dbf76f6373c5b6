use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use wm_dispatcher::{BlurAnalyzer, BlurVerdict, CrawlOutcome, Dispatcher, EmailTransport, PageCrawler, PerformanceAnalyzer, PerformanceScore, ScreenshotCapture};
use wm_domain::config::{NotificationConfig, SchedulerConfig};
use wm_domain::error::Result;
use wm_domain::{CheckParameters, FeatureFlags, Website};
use wm_scheduler::SchedulerCore;
use wm_storage::Monitor;

struct FakeCrawler;

#[async_trait]
impl PageCrawler for FakeCrawler {
    async fn crawl(&self, _start_url: &str, _max_depth: u32, _exclude: &[String]) -> Result<CrawlOutcome> {
        Ok(CrawlOutcome {
            pages: vec!["https://example.com/".to_string()],
            images: vec![],
            broken_links: vec![],
            missing_meta_tags: vec![],
            has_sitemap: false,
            internal_links: 1,
            external_links: 0,
        })
    }
}

struct FakeScreenshot;

#[async_trait]
impl ScreenshotCapture for FakeScreenshot {
    async fn capture(&self, _url: &str, _delay: u32) -> Result<Vec<u8>> {
        Ok(vec![9, 9, 9])
    }
}

struct FakeBlur;

impl BlurAnalyzer for FakeBlur {
    fn analyze(&self, _bytes: &[u8]) -> Result<BlurVerdict> {
        Ok(BlurVerdict { variance: 500.0, spatial_blur_ratio: 0.0 })
    }
}

struct FakePerformance;

#[async_trait]
impl PerformanceAnalyzer for FakePerformance {
    async fn analyze(&self, _url: &str) -> Result<PerformanceScore> {
        Ok(PerformanceScore { mobile_score: 80.0, desktop_score: 80.0, issues: vec![] })
    }
}

struct NoopEmail;

#[async_trait]
impl EmailTransport for NoopEmail {
    async fn send(&self, _sender: &str, _recipients: &[String], _subject: &str, _html: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

fn website(id: &str, cadence_minutes: u32) -> Website {
    Website {
        id: id.to_string(),
        url: "https://example.com".to_string(),
        display_name: "Example Site".to_string(),
        cadence_minutes,
        is_active: true,
        tags: BTreeSet::new(),
        notification_recipients: vec![],
        flags: FeatureFlags { crawl_enabled: true, visual_enabled: false, blur_enabled: false, performance_enabled: false, full_check_enabled: false },
        params: CheckParameters {
            max_crawl_depth: 2,
            render_delay_seconds: 0,
            visual_diff_threshold_percent: 5.0,
            capture_subpages: true,
            exclude_page_keywords: vec![],
        },
        baselines: Default::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn make_dispatcher(monitor: Arc<Monitor>, snapshot_dir: &std::path::Path) -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::new(
            monitor,
            snapshot_dir.to_path_buf(),
            Arc::new(FakeCrawler),
            Arc::new(FakeScreenshot),
            Arc::new(FakeBlur),
            Arc::new(FakePerformance),
            Arc::new(NoopEmail),
            NotificationConfig::default(),
        )
        .unwrap(),
    )
}

fn make_core(
    monitor: Arc<Monitor>,
    dispatcher: Arc<Dispatcher>,
    data_dir: &std::path::Path,
    config: SchedulerConfig,
) -> Arc<SchedulerCore> {
    SchedulerCore::new(
        monitor,
        dispatcher,
        config,
        data_dir.join("scheduler.lock"),
        data_dir.join("scheduler_state.json"),
        Arc::new(tokio::sync::Mutex::new(())),
    )
}

#[tokio::test]
async fn start_builds_job_set_from_active_websites_and_persists_state() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1", 60)).unwrap();
    let mut inactive = website("site-2", 60);
    inactive.is_active = false;
    monitor.catalog.upsert(inactive).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());
    let core = make_core(monitor, dispatcher, dir.path(), SchedulerConfig::default());

    core.start().unwrap();
    let status = core.status();
    assert!(status.is_running);
    assert_eq!(status.scheduled_count, 1, "inactive websites must not be scheduled");

    core.stop().await.unwrap();
    assert!(!core.status().is_running);
    assert!(dir.path().join("scheduler_state.json").exists());
}

#[tokio::test]
async fn disabled_scheduler_refuses_to_start() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());
    let config = SchedulerConfig { scheduler_enabled: false, ..SchedulerConfig::default() };
    let core = make_core(monitor, dispatcher, dir.path(), config);

    assert!(core.start().is_err());
}

#[tokio::test]
async fn second_instance_cannot_start_against_the_same_lock_file() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());

    let first = make_core(monitor.clone(), dispatcher.clone(), dir.path(), SchedulerConfig::default());
    first.start().unwrap();

    let second = make_core(monitor, dispatcher, dir.path(), SchedulerConfig::default());
    let result = second.start();
    assert!(result.is_err(), "a second scheduler instance must not acquire a live lock");

    first.stop().await.unwrap();
}

#[tokio::test]
async fn force_reschedule_rebuilds_the_job_set_from_the_catalog() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1", 30)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());
    let core = make_core(monitor.clone(), dispatcher, dir.path(), SchedulerConfig::default());
    core.start().unwrap();
    assert_eq!(core.status().scheduled_count, 1);

    monitor.catalog.upsert(website("site-2", 30)).unwrap();
    core.force_reschedule().unwrap();
    assert_eq!(core.status().scheduled_count, 2);

    core.stop().await.unwrap();
}

#[tokio::test]
async fn deleting_a_website_drops_its_job_via_the_catalog_hook() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1", 30)).unwrap();
    monitor.catalog.upsert(website("site-2", 30)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());
    let core = make_core(monitor.clone(), dispatcher, dir.path(), SchedulerConfig::default());
    core.start().unwrap();
    assert_eq!(core.status().scheduled_count, 2);

    monitor.catalog.delete("site-1").unwrap();
    assert_eq!(core.status().scheduled_count, 1, "the deletion hook must remove the job without a restart");

    core.stop().await.unwrap();
}

#[tokio::test]
async fn worker_loop_runs_an_immediately_due_job_and_writes_history() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    // cadence 0 minutes is off-spec for a real website but makes the job due
    // the instant it is scheduled, keeping this test fast and deterministic.
    monitor.catalog.upsert(website("site-1", 0)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path());
    let config = SchedulerConfig { max_sleep_seconds: 1, ..SchedulerConfig::default() };
    let core = make_core(monitor.clone(), dispatcher, dir.path(), config);
    core.start().unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let history = monitor.history.list_recent("site-1", 10).unwrap();
    assert!(!history.is_empty(), "a zero-cadence website must be checked almost immediately");

    core.stop().await.unwrap();
}
