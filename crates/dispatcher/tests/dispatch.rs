use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use wm_dispatcher::{
    BlurAnalyzer, BlurVerdict, CrawlOutcome, Dispatcher, EmailTransport, PageCrawler, PerformanceAnalyzer,
    PerformanceScore, ScreenshotCapture,
};
use wm_domain::config::NotificationConfig;
use wm_domain::error::Result;
use wm_domain::{CheckConfig, CheckStatus, FeatureFlags, Website};
use wm_storage::Monitor;

struct FakeCrawler {
    pages: Vec<String>,
}

#[async_trait]
impl PageCrawler for FakeCrawler {
    async fn crawl(&self, _start_url: &str, _max_depth: u32, _exclude: &[String]) -> Result<CrawlOutcome> {
        Ok(CrawlOutcome {
            pages: self.pages.clone(),
            images: vec!["https://example.com/photo.jpg".to_string()],
            broken_links: vec![],
            missing_meta_tags: vec![],
            has_sitemap: true,
            internal_links: self.pages.len() as u32,
            external_links: 0,
        })
    }
}

struct FakeScreenshot;

#[async_trait]
impl ScreenshotCapture for FakeScreenshot {
    async fn capture(&self, _url: &str, _delay: u32) -> Result<Vec<u8>> {
        Ok(vec![1, 2, 3, 4])
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
        Ok(PerformanceScore { mobile_score: 80.0, desktop_score: 90.0, issues: vec![] })
    }
}

#[derive(Default, Clone)]
struct RecordingEmail {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl EmailTransport for RecordingEmail {
    async fn send(&self, _sender: &str, _recipients: &[String], subject: &str, _html: &str, _text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

fn website(id: &str, flags: FeatureFlags) -> Website {
    Website {
        id: id.to_string(),
        url: "https://example.com".to_string(),
        display_name: "Example Site".to_string(),
        cadence_minutes: 60,
        is_active: true,
        tags: BTreeSet::new(),
        notification_recipients: vec!["ops@example.com".to_string()],
        flags,
        params: wm_domain::CheckParameters {
            max_crawl_depth: 2,
            render_delay_seconds: 1,
            visual_diff_threshold_percent: 5.0,
            capture_subpages: true,
            exclude_page_keywords: vec![],
        },
        baselines: Default::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn all_enabled() -> FeatureFlags {
    FeatureFlags {
        crawl_enabled: true,
        visual_enabled: true,
        blur_enabled: true,
        performance_enabled: true,
        full_check_enabled: true,
    }
}

fn make_dispatcher(monitor: Arc<Monitor>, snapshot_dir: &std::path::Path, email: RecordingEmail) -> Dispatcher {
    Dispatcher::new(
        monitor,
        snapshot_dir.to_path_buf(),
        Arc::new(FakeCrawler { pages: vec!["https://example.com/".to_string(), "https://example.com/about".to_string()] }),
        Arc::new(FakeScreenshot),
        Arc::new(FakeBlur),
        Arc::new(FakePerformance),
        Arc::new(email),
        NotificationConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn visual_check_without_baselines_is_a_precondition_failure() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let email = RecordingEmail::default();
    let dispatcher = make_dispatcher(monitor.clone(), dir.path(), email.clone());

    let site = website("site-1", all_enabled());
    let config = CheckConfig::for_manual(wm_domain::CheckType::Visual, site.flags, false);

    let record = dispatcher.run(site, config, true).await.unwrap();

    assert_eq!(record.status, CheckStatus::Failed);
    assert!(record.error_message.unwrap().contains("create baselines"));
    assert_eq!(email.sent.lock().unwrap().len(), 1);
    assert!(email.sent.lock().unwrap()[0].starts_with("Check Failed"));
}

#[tokio::test]
async fn baseline_creation_populates_catalog_and_reports_baseline_created() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let email = RecordingEmail::default();

    let site = website("site-2", all_enabled());
    monitor.catalog.upsert(site.clone()).unwrap();

    let dispatcher = make_dispatcher(monitor.clone(), dir.path(), email.clone());
    let config = CheckConfig::for_manual(wm_domain::CheckType::Baseline, site.flags, false);
    assert!(config.create_baseline);

    let record = dispatcher.run(site, config, true).await.unwrap();

    assert_eq!(record.status, CheckStatus::Completed);
    let stored = monitor.catalog.get("site-2").unwrap();
    assert!(stored.has_baselines());
    assert!(email.sent.lock().unwrap()[0].contains("Baselines Created"));
}

#[tokio::test]
async fn scheduled_full_check_runs_all_four_phases_and_persists_history() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let email = RecordingEmail::default();

    let mut site = website("site-3", all_enabled());
    site.baselines.insert(
        "https://example.com/".to_string(),
        wm_domain::Baseline { image_path: "nonexistent.png".to_string(), captured_at: Utc::now() },
    );
    site.baselines.insert(
        "https://example.com/about".to_string(),
        wm_domain::Baseline { image_path: "nonexistent.png".to_string(), captured_at: Utc::now() },
    );

    let dispatcher = make_dispatcher(monitor.clone(), dir.path(), email.clone());
    let config = CheckConfig::for_automated(site.flags);
    assert_eq!(config.phase_count(), 4);

    let record = dispatcher.run(site, config, false).await.unwrap();

    assert_eq!(record.status, CheckStatus::Completed);
    assert!(record.crawl.is_some());
    assert!(record.visual.is_some());
    assert!(record.blur.is_some());
    assert!(record.performance.is_some());

    let history = monitor.history.list_recent("site-3", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert!(email.sent.lock().unwrap()[0].starts_with("Scheduled Full Check"));
}

#[tokio::test]
async fn manual_single_phase_report_is_classified_correctly() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let email = RecordingEmail::default();

    let site = website("site-4", all_enabled());
    let dispatcher = make_dispatcher(monitor.clone(), dir.path(), email.clone());
    let config = CheckConfig::for_manual(wm_domain::CheckType::Crawl, site.flags, true);

    let record = dispatcher.run(site, config, true).await.unwrap();

    assert_eq!(record.status, CheckStatus::Completed);
    let subject = email.sent.lock().unwrap()[0].clone();
    assert!(subject.starts_with("Manual Crawl Check"), "unexpected subject: {subject}");
}

#[tokio::test]
async fn crawl_failure_produces_an_error_report_and_failed_history_record() {
    struct AlwaysFailsCrawler;

    #[async_trait]
    impl PageCrawler for AlwaysFailsCrawler {
        async fn crawl(&self, _start_url: &str, _max_depth: u32, _exclude: &[String]) -> Result<CrawlOutcome> {
            Err(wm_domain::error::Error::other("dns resolution failed"))
        }
    }

    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let email = RecordingEmail::default();

    let site = website("site-5", all_enabled());
    let dispatcher = Dispatcher::new(
        monitor.clone(),
        dir.path().to_path_buf(),
        Arc::new(AlwaysFailsCrawler),
        Arc::new(FakeScreenshot),
        Arc::new(FakeBlur),
        Arc::new(FakePerformance),
        Arc::new(email.clone()),
        NotificationConfig::default(),
    )
    .unwrap();

    let config = CheckConfig::for_automated(site.flags);
    let record = dispatcher.run(site, config, false).await.unwrap();

    assert_eq!(record.status, CheckStatus::Failed);
    assert!(record.error_message.unwrap().contains("dns resolution failed"));
    let history = monitor.history.list_recent("site-5", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, CheckStatus::Failed);
    assert!(email.sent.lock().unwrap()[0].starts_with("Check Failed"));
}
