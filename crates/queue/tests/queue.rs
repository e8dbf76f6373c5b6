use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use wm_dispatcher::{BlurAnalyzer, BlurVerdict, CrawlOutcome, Dispatcher, EmailTransport, PageCrawler, PerformanceAnalyzer, PerformanceScore, ScreenshotCapture};
use wm_domain::config::NotificationConfig;
use wm_domain::error::Result;
use wm_domain::{CheckParameters, CheckType, FeatureFlags, Priority, QueueStatus, Website};
use wm_queue::{QueueEvent, QueueProcessor};
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
        Ok(vec![1, 2, 3])
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
        Ok(PerformanceScore { mobile_score: 90.0, desktop_score: 90.0, issues: vec![] })
    }
}

struct NoopEmail;

#[async_trait]
impl EmailTransport for NoopEmail {
    async fn send(&self, _sender: &str, _recipients: &[String], _subject: &str, _html: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

fn website(id: &str) -> Website {
    Website {
        id: id.to_string(),
        url: "https://example.com".to_string(),
        display_name: "Example Site".to_string(),
        cadence_minutes: 60,
        is_active: true,
        tags: BTreeSet::new(),
        notification_recipients: vec![],
        flags: FeatureFlags { crawl_enabled: true, visual_enabled: true, blur_enabled: false, performance_enabled: false, full_check_enabled: false },
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

fn make_processor(monitor: Arc<Monitor>, snapshot_dir: &std::path::Path) -> Arc<QueueProcessor> {
    let dispatcher = Arc::new(
        Dispatcher::new(
            monitor.clone(),
            snapshot_dir.to_path_buf(),
            Arc::new(FakeCrawler),
            Arc::new(FakeScreenshot),
            Arc::new(FakeBlur),
            Arc::new(FakePerformance),
            Arc::new(NoopEmail),
            NotificationConfig::default(),
        )
        .unwrap(),
    );
    QueueProcessor::new(
        monitor,
        dispatcher,
        Arc::new(tokio::sync::Mutex::new(())),
        chrono::Duration::days(7),
        chrono::Duration::days(30),
    )
}

#[tokio::test]
async fn duplicate_manual_submission_returns_the_same_queue_id() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let processor = make_processor(monitor.clone(), dir.path());

    let first = processor.enqueue("site-1", CheckType::Crawl, None).unwrap();
    let second = processor.enqueue("site-1", CheckType::Crawl, None).unwrap();
    assert_eq!(first, second);

    let pending = monitor.catalog.list_pending(&wm_storage::QueueFilter { website_id: Some("site-1".to_string()), status: Some(QueueStatus::Pending) }).unwrap();
    assert_eq!(pending.len(), 1, "duplicate submissions must not create a second pending row");
}

#[tokio::test]
async fn priority_ordering_dequeues_manual_items_before_a_simulated_scheduled_one() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("w1")).unwrap();
    monitor.catalog.upsert(website("w2")).unwrap();
    monitor.catalog.upsert(website("w3")).unwrap();

    monitor.catalog.enqueue_with_priority("w1", CheckType::Full, None, Priority::MANUAL).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.catalog.enqueue_with_priority("w3", CheckType::Full, None, Priority::SCHEDULED).unwrap();
    monitor.catalog.enqueue_with_priority("w2", CheckType::Crawl, None, Priority::MANUAL).unwrap();

    let first = monitor.catalog.dequeue_next().unwrap().unwrap();
    assert_eq!(first.website_id, "w1");
    monitor.catalog.update_status(&first.id, QueueStatus::Completed, None, None).unwrap();

    let second = monitor.catalog.dequeue_next().unwrap().unwrap();
    assert_eq!(second.website_id, "w2");
    monitor.catalog.update_status(&second.id, QueueStatus::Completed, None, None).unwrap();

    let third = monitor.catalog.dequeue_next().unwrap().unwrap();
    assert_eq!(third.website_id, "w3");
}

#[tokio::test]
async fn processor_drains_an_enqueued_item_to_completion() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let processor = make_processor(monitor.clone(), dir.path());

    let mut events = processor.subscribe();
    let queue_id = processor.enqueue("site-1", CheckType::Crawl, None).unwrap();
    processor.start();

    let mut saw_completed = false;
    for _ in 0..20 {
        if let Ok(QueueEvent::StatusChanged { queue_id: id, status, .. }) = tokio::time::timeout(Duration::from_millis(500), events.recv()).await.unwrap_or(Err(tokio::sync::broadcast::error::RecvError::Closed)) {
            if id == queue_id && status == QueueStatus::Completed {
                saw_completed = true;
                break;
            }
        }
    }
    assert!(saw_completed, "the queue processor must drain the item to completion");

    processor.stop().await;
}

#[tokio::test]
async fn missing_website_fails_the_item_with_a_user_visible_message() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    let dir = tempfile::tempdir().unwrap();
    let processor = make_processor(monitor.clone(), dir.path());

    let queue_id = monitor.catalog.enqueue("ghost-site", CheckType::Crawl, None).unwrap();
    processor.start();

    let mut failed_message = None;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let items = monitor.catalog.list_pending(&wm_storage::QueueFilter { website_id: Some("ghost-site".to_string()), status: Some(QueueStatus::Failed) }).unwrap();
        if let Some(item) = items.into_iter().find(|i| i.id == queue_id) {
            failed_message = item.error_message;
            break;
        }
    }
    processor.stop().await;

    assert_eq!(failed_message.as_deref(), Some("Website not found. It may have been deleted after this check was queued."));
}

#[tokio::test]
async fn manual_visual_without_baselines_fails_with_the_exact_precondition_message() {
    let monitor = Arc::new(Monitor::open_in_memory().unwrap());
    monitor.catalog.upsert(website("site-1")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let processor = make_processor(monitor.clone(), dir.path());

    let queue_id = processor.enqueue("site-1", CheckType::Visual, None).unwrap();
    processor.start();

    let mut failed_message = None;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let items = monitor.catalog.list_pending(&wm_storage::QueueFilter { website_id: Some("site-1".to_string()), status: Some(QueueStatus::Failed) }).unwrap();
        if let Some(item) = items.into_iter().find(|i| i.id == queue_id) {
            failed_message = item.error_message;
            break;
        }
    }
    processor.stop().await;

    assert_eq!(failed_message.as_deref(), Some("Please first create baselines, then do the visual check."));

    let history = monitor.history.list_recent("site-1", 10).unwrap();
    assert!(
        history.iter().all(|r| r.status != wm_domain::CheckStatus::Completed),
        "a precondition-aborted visual check must not write a completed history record"
    );
}
