use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wm_domain::config::NotificationConfig;
use wm_domain::error::{Error, Result};
use wm_domain::{
    Baseline, BlurSummary, CheckConfig, CheckRecord, CheckStatus, CrawlSummary, PagePerformance,
    PageVisualDiff, PerformanceSummary, VisualSummary, Website,
};
use wm_storage::Monitor;

use crate::report::{self, ReportKind};
use crate::snapshot::{host_of, SnapshotLayout};
use crate::traits::{BlurAnalyzer, EmailTransport, PageCrawler, PerformanceAnalyzer, ScreenshotCapture};

/// Image hosts known to serve tracking pixels rather than content images;
/// skipped by the blur phase without counting as a download failure.
const TRACKING_HOSTS: &[&str] = &[
    "doubleclick.net",
    "google-analytics.com",
    "googletagmanager.com",
    "scorecardresearch.com",
    "hotjar.com",
];

const PERFORMANCE_SAMPLE_SIZE: usize = 5;
const IMAGE_DOWNLOAD_RETRIES: u32 = 3;
const IMAGE_DOWNLOAD_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// The composition point: given `(website, check_config, is_manual)`,
/// invokes whichever collaborators the config asks for, persists a history
/// record, updates baselines, and emits exactly one report (spec §4.4).
pub struct Dispatcher {
    monitor: Arc<Monitor>,
    snapshot_root: std::path::PathBuf,
    crawler: Arc<dyn PageCrawler>,
    screenshots: Arc<dyn ScreenshotCapture>,
    blur: Arc<dyn BlurAnalyzer>,
    performance: Arc<dyn PerformanceAnalyzer>,
    email: Arc<dyn EmailTransport>,
    notification: NotificationConfig,
    image_client: reqwest::Client,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        monitor: Arc<Monitor>,
        snapshot_root: std::path::PathBuf,
        crawler: Arc<dyn PageCrawler>,
        screenshots: Arc<dyn ScreenshotCapture>,
        blur: Arc<dyn BlurAnalyzer>,
        performance: Arc<dyn PerformanceAnalyzer>,
        email: Arc<dyn EmailTransport>,
        notification: NotificationConfig,
    ) -> Result<Self> {
        let image_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            monitor,
            snapshot_root,
            crawler,
            screenshots,
            blur,
            performance,
            email,
            notification,
            image_client,
        })
    }

    pub async fn run(&self, mut website: Website, config: CheckConfig, is_manual: bool) -> Result<CheckRecord> {
        tracing::info!(website_id = %website.id, is_manual, "dispatcher: starting check");

        let mut record = CheckRecord::new(website.id.clone(), is_manual);
        let layout = SnapshotLayout::new(&self.snapshot_root, host_of(&website.url), &website.id);

        let needs_pages = config.crawl || config.visual || config.blur || config.performance;
        let mut fatal: Option<String> = None;

        let crawl_outcome = if needs_pages {
            match self
                .crawler
                .crawl(&website.url, website.params.max_crawl_depth, &website.params.exclude_page_keywords)
                .await
            {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    fatal = Some(format!("Crawl failed: {e}"));
                    None
                }
            }
        } else {
            None
        };

        if config.crawl {
            if let Some(outcome) = &crawl_outcome {
                record.crawl = Some(CrawlSummary {
                    pages_crawled: outcome.pages.len() as u32,
                    internal_links: outcome.internal_links,
                    external_links: outcome.external_links,
                    has_sitemap: outcome.has_sitemap,
                    broken_links: outcome.broken_links.clone(),
                    missing_meta_tags: outcome.missing_meta_tags.clone(),
                });
            }
        }

        let mut baselines_created = Vec::new();

        if fatal.is_none() && config.visual {
            if let Some(outcome) = &crawl_outcome {
                match self
                    .run_visual(&website, &layout, &outcome.pages, config.create_baseline, &mut baselines_created)
                    .await
                {
                    Ok(summary) => record.visual = Some(summary),
                    Err(e) => fatal = Some(e.to_string()),
                }
            }
        }

        if fatal.is_none() && config.blur {
            if let Some(outcome) = &crawl_outcome {
                record.blur = Some(self.run_blur(&layout, &outcome.images).await);
            }
        }

        if fatal.is_none() && config.performance {
            if let Some(outcome) = &crawl_outcome {
                record.performance = Some(self.run_performance(&outcome.pages).await);
            }
        }

        if !baselines_created.is_empty() {
            for page_url in &baselines_created {
                website.baselines.insert(
                    page_url.clone(),
                    Baseline { image_path: layout.baseline_path(page_url).display().to_string(), captured_at: Utc::now() },
                );
            }
            self.monitor.catalog.update_baselines(&website.id, website.baselines.clone())?;
        }

        let attempted = [config.crawl, config.visual, config.blur, config.performance];

        match fatal {
            Some(message) => {
                record.status = CheckStatus::Failed;
                record.error_message = Some(message);
            }
            None => {
                record.status = CheckStatus::Completed;
                website.updated_at = Utc::now();
            }
        }

        self.monitor.history.insert(&record)?;

        let kind = report::classify(&record, config.create_baseline, attempted);
        let summary = summarize(&record);
        let rendered = report::build(
            &website,
            &record,
            kind,
            &summary,
            &self.notification.default_notification_recipients,
            &self.notification.dashboard_url,
        );

        if rendered.recipients.is_empty() {
            tracing::warn!(website_id = %website.id, "dispatcher: skipping notification, no recipients");
        } else if let Err(e) = self
            .email
            .send(&self.notification.notification_sender, &rendered.recipients, &rendered.subject, &rendered.html, &rendered.text)
            .await
        {
            tracing::error!(website_id = %website.id, error = %e, "dispatcher: notification send failed");
        }

        tracing::info!(website_id = %website.id, status = ?record.status, "dispatcher: check complete");
        Ok(record)
    }

    async fn run_visual(
        &self,
        website: &Website,
        layout: &SnapshotLayout,
        pages: &[String],
        create_baseline: bool,
        baselines_created: &mut Vec<String>,
    ) -> Result<VisualSummary> {
        let candidates: Vec<&String> = pages.iter().filter(|p| !website.is_page_excluded(p.as_str())).collect();

        if !create_baseline && candidates.iter().all(|p| !website.baselines.contains_key(p.as_str())) {
            return Err(Error::Precondition(
                "Please first create baselines, then do the visual check.".into(),
            ));
        }

        let mut summary = VisualSummary::default();

        for page_url in candidates {
            let shot = match self.screenshots.capture(page_url, website.params.render_delay_seconds).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, "visual: screenshot capture failed, skipping page");
                    continue;
                }
            };

            if create_baseline {
                layout.write_atomic(&layout.baseline_path(page_url), &shot)?;
                baselines_created.push(page_url.clone());
                continue;
            }

            let timestamp = Utc::now().to_rfc3339();
            layout.write_atomic(&layout.visual_path(page_url, &timestamp), &shot)?;

            let diff_percent = match website.baselines.get(page_url.as_str()) {
                Some(baseline) => compare_against_baseline(&shot, &baseline.image_path),
                None => 100.0,
            };
            let flagged_change = diff_percent > website.params.visual_diff_threshold_percent;
            let diff_image_path = if flagged_change {
                let path = layout.diff_path(page_url, &timestamp);
                layout.write_atomic(&path, &shot)?;
                Some(path.display().to_string())
            } else {
                None
            };

            summary.pages.push(PageVisualDiff {
                page_url: page_url.clone(),
                diff_percent,
                flagged_change,
                diff_image_path,
            });
        }

        summary.baselines_created = baselines_created.clone();
        Ok(summary)
    }

    async fn run_blur(&self, layout: &SnapshotLayout, image_urls: &[String]) -> BlurSummary {
        let mut summary = BlurSummary::default();

        for raw_url in image_urls {
            let Some(normalized) = normalize_image_url(raw_url) else { continue };

            let bytes = match self.download_image(&normalized).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url = %normalized, error = %e, "blur: image download failed, skipping");
                    continue;
                }
            };

            let verdict = match self.blur.analyze(&bytes) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(url = %normalized, error = %e, "blur: analysis failed, skipping");
                    continue;
                }
            };

            summary.images_processed += 1;
            if verdict.is_blurry() {
                summary.blurry_count += 1;
                let hash = content_hash(&bytes);
                if let Err(e) = layout.write_atomic(&layout.blur_image_path(&hash), &bytes) {
                    tracing::warn!(url = %normalized, error = %e, "blur: failed to persist blurry image");
                }
            }
        }

        if summary.images_processed > 0 {
            summary.blur_percent = summary.blurry_count as f64 / summary.images_processed as f64 * 100.0;
        }
        summary
    }

    async fn run_performance(&self, pages: &[String]) -> PerformanceSummary {
        let mut summary = PerformanceSummary::default();
        let mut slowest: Option<(String, f64)> = None;

        for page_url in pages.iter().take(PERFORMANCE_SAMPLE_SIZE) {
            let score = match self.performance.analyze(page_url).await {
                Ok(score) => score,
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, "performance: analysis failed, skipping page");
                    continue;
                }
            };

            let combined = (score.mobile_score + score.desktop_score) / 2.0;
            if slowest.as_ref().map(|(_, s)| combined < *s).unwrap_or(true) {
                slowest = Some((page_url.clone(), combined));
            }

            summary.pages.push(PagePerformance {
                page_url: page_url.clone(),
                mobile_score: score.mobile_score,
                desktop_score: score.desktop_score,
                issues: score.issues,
            });
        }

        if !summary.pages.is_empty() {
            summary.average_mobile_score =
                summary.pages.iter().map(|p| p.mobile_score).sum::<f64>() / summary.pages.len() as f64;
            summary.average_desktop_score =
                summary.pages.iter().map(|p| p.desktop_score).sum::<f64>() / summary.pages.len() as f64;
            summary.slowest_page = slowest.map(|(url, _)| url);
        }
        summary
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.image_client.get(url).send().await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    let is_image = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(|ct| ct.starts_with("image/"))
                        .unwrap_or(false);
                    if !is_image {
                        return Err(Error::other(format!("{url} is not an image content type")));
                    }
                    return resp.bytes().await.map(|b| b.to_vec()).map_err(|e| Error::Http(e.to_string()));
                }
                Ok(resp) if attempt >= IMAGE_DOWNLOAD_RETRIES => {
                    return Err(Error::Http(format!("{url} responded {}", resp.status())));
                }
                Err(e) if attempt >= IMAGE_DOWNLOAD_RETRIES => {
                    return Err(Error::Http(e.to_string()));
                }
                _ => {
                    tokio::time::sleep(IMAGE_DOWNLOAD_BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
                }
            }
        }
    }
}

fn content_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Reject data URIs and known tracking hosts, upgrade scheme to HTTPS, and
/// resolve protocol-relative URLs (`//host/path`), per the blur phase's
/// image-inventory normalization step (spec §4.4).
fn normalize_image_url(raw: &str) -> Option<String> {
    if raw.starts_with("data:") {
        return None;
    }
    let candidate = if let Some(rest) = raw.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = raw.strip_prefix("http://") {
        format!("https://{rest}")
    } else {
        raw.to_string()
    };

    if TRACKING_HOSTS.iter().any(|host| candidate.contains(host)) {
        return None;
    }
    if !candidate.starts_with("https://") {
        return None;
    }
    Some(candidate)
}

/// Placeholder pixel-difference estimate: real image-diffing is out of
/// scope for this adapter layer (the `ScreenshotCapture`/`BlurAnalyzer`
/// collaborators own image decoding). A byte-length delta is a crude but
/// deterministic stand-in that still exercises the threshold/flagging logic.
fn compare_against_baseline(current: &[u8], baseline_path: &str) -> f64 {
    let Ok(baseline_bytes) = std::fs::read(baseline_path) else {
        return 100.0;
    };
    if baseline_bytes.is_empty() {
        return 100.0;
    }
    let delta = (current.len() as f64 - baseline_bytes.len() as f64).abs();
    (delta / baseline_bytes.len() as f64 * 100.0).min(100.0)
}

fn summarize(record: &CheckRecord) -> String {
    if let Some(err) = &record.error_message {
        return err.clone();
    }
    let mut parts = Vec::new();
    if let Some(crawl) = &record.crawl {
        parts.push(format!("{} pages crawled", crawl.pages_crawled));
    }
    if let Some(visual) = &record.visual {
        let flagged = visual.pages.iter().filter(|p| p.flagged_change).count();
        if flagged > 0 {
            parts.push(format!("{flagged} pages changed"));
        } else if !visual.baselines_created.is_empty() {
            parts.push(format!("{} baselines created", visual.baselines_created.len()));
        } else {
            parts.push("no visual changes".to_string());
        }
    }
    if let Some(blur) = &record.blur {
        if blur.blurry_count > 0 {
            parts.push(format!("{} blurry images", blur.blurry_count));
        }
    }
    if let Some(perf) = &record.performance {
        if !perf.pages.is_empty() {
            parts.push(format!("avg mobile score {:.0}", perf.average_mobile_score));
        }
    }
    if parts.is_empty() {
        "no changes detected".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rejects_data_uris() {
        assert_eq!(normalize_image_url("data:image/png;base64,AA=="), None);
    }

    #[test]
    fn normalize_upgrades_http_to_https() {
        assert_eq!(normalize_image_url("http://example.com/a.png").as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn normalize_resolves_protocol_relative() {
        assert_eq!(normalize_image_url("//cdn.example.com/a.png").as_deref(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn normalize_rejects_tracking_hosts() {
        assert_eq!(normalize_image_url("https://doubleclick.net/pixel.gif"), None);
    }

}
