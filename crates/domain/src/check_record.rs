use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome status of a completed (or attempted) check run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CrawlSummary {
    pub pages_crawled: u32,
    pub internal_links: u32,
    pub external_links: u32,
    pub has_sitemap: bool,
    pub broken_links: Vec<String>,
    pub missing_meta_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageVisualDiff {
    pub page_url: String,
    pub diff_percent: f64,
    pub flagged_change: bool,
    pub diff_image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VisualSummary {
    pub pages: Vec<PageVisualDiff>,
    pub baselines_created: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BlurSummary {
    pub images_processed: u32,
    pub blurry_count: u32,
    pub blur_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagePerformance {
    pub page_url: String,
    pub mobile_score: f64,
    pub desktop_score: f64,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PerformanceSummary {
    pub pages: Vec<PagePerformance>,
    pub average_mobile_score: f64,
    pub average_desktop_score: f64,
    pub slowest_page: Option<String>,
}

/// One row of the append-mostly History Store: the durable record of a
/// completed (or failed) check run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckRecord {
    pub id: String,
    pub website_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: CheckStatus,
    pub is_manual: bool,
    pub is_change_report: bool,
    pub crawl: Option<CrawlSummary>,
    pub visual: Option<VisualSummary>,
    pub blur: Option<BlurSummary>,
    pub performance: Option<PerformanceSummary>,
    pub error_message: Option<String>,
}

impl CheckRecord {
    pub fn new(website_id: impl Into<String>, is_manual: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            website_id: website_id.into(),
            timestamp: Utc::now(),
            status: CheckStatus::Completed,
            is_manual,
            is_change_report: false,
            crawl: None,
            visual: None,
            blur: None,
            performance: None,
            error_message: None,
        }
    }
}
