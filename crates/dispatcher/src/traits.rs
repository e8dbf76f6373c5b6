use async_trait::async_trait;
use wm_domain::error::Result;

/// Outcome of one crawl invocation: the page list plus everything the
/// downstream phases (blur, report) need without re-crawling.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub pages: Vec<String>,
    pub images: Vec<String>,
    pub broken_links: Vec<String>,
    pub missing_meta_tags: Vec<String>,
    pub has_sitemap: bool,
    pub internal_links: u32,
    pub external_links: u32,
}

/// Discovers pages reachable from `start_url` up to `max_depth`, honoring
/// `exclude_keywords` (case-insensitive path substrings). Per-page failures
/// must be folded into `broken_links`, never abort the whole crawl.
#[async_trait]
pub trait PageCrawler: Send + Sync {
    async fn crawl(
        &self,
        start_url: &str,
        max_depth: u32,
        exclude_keywords: &[String],
    ) -> Result<CrawlOutcome>;
}

/// Captures a screenshot of `url`, returning encoded image bytes (PNG).
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    async fn capture(&self, url: &str, render_delay_seconds: u32) -> Result<Vec<u8>>;
}

/// The two blur signals the Dispatcher thresholds against (variance below
/// 100 or spatial ratio above 15% → blurry, per spec §6).
#[derive(Debug, Clone, Copy)]
pub struct BlurVerdict {
    pub variance: f64,
    pub spatial_blur_ratio: f64,
}

impl BlurVerdict {
    pub fn is_blurry(&self) -> bool {
        self.variance < 100.0 || self.spatial_blur_ratio > 0.15
    }
}

pub trait BlurAnalyzer: Send + Sync {
    fn analyze(&self, image_bytes: &[u8]) -> Result<BlurVerdict>;
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceScore {
    pub mobile_score: f64,
    pub desktop_score: f64,
    pub issues: Vec<String>,
}

#[async_trait]
pub trait PerformanceAnalyzer: Send + Sync {
    async fn analyze(&self, url: &str) -> Result<PerformanceScore>;
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<()>;
}
