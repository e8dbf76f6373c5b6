use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Website
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single page's stored baseline snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Baseline {
    pub image_path: String,
    pub captured_at: DateTime<Utc>,
}

/// The feature flags that gate which check phases a website participates
/// in, both for scheduled and (after ANDing against a request template) for
/// manual checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub crawl_enabled: bool,
    pub visual_enabled: bool,
    pub blur_enabled: bool,
    pub performance_enabled: bool,
    pub full_check_enabled: bool,
}

/// Per-site check parameters. Falls back to configured defaults when a site
/// does not override them (the Catalog Store fills these at creation time;
/// `Website` always carries concrete values).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckParameters {
    pub max_crawl_depth: u32,
    pub render_delay_seconds: u32,
    pub visual_diff_threshold_percent: f64,
    pub capture_subpages: bool,
    pub exclude_page_keywords: Vec<String>,
}

/// A registered, monitored website.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Website {
    pub id: String,
    pub url: String,
    pub display_name: String,
    pub cadence_minutes: u32,
    pub is_active: bool,
    pub tags: BTreeSet<String>,
    pub notification_recipients: Vec<String>,
    pub flags: FeatureFlags,
    pub params: CheckParameters,
    pub baselines: BTreeMap<String, Baseline>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Website {
    /// `true` once at least one page has a stored baseline.
    pub fn has_baselines(&self) -> bool {
        !self.baselines.is_empty()
    }

    /// Is `page_url`'s path excluded from visual/baseline work per the
    /// site's `exclude_page_keywords`? Matching is a case-insensitive
    /// substring match against the URL path.
    pub fn is_page_excluded(&self, page_url: &str) -> bool {
        let path = url_path_lower(page_url);
        self.params
            .exclude_page_keywords
            .iter()
            .any(|kw| path.contains(&kw.to_ascii_lowercase()))
    }
}

fn url_path_lower(url: &str) -> String {
    // Best-effort path extraction without pulling in a full URL parse here;
    // `wm-dispatcher` uses the `url` crate for anything that needs to be
    // correct against exotic inputs. This only needs the path component for
    // a substring match.
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let path_and_after = without_scheme.splitn(2, '/').nth(1).unwrap_or("");
    format!("/{}", path_and_after).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(keywords: &[&str]) -> Website {
        Website {
            id: "w1".into(),
            url: "https://example.com".into(),
            display_name: "Example".into(),
            cadence_minutes: 60,
            is_active: true,
            tags: BTreeSet::new(),
            notification_recipients: vec![],
            flags: FeatureFlags::default(),
            params: CheckParameters {
                max_crawl_depth: 3,
                render_delay_seconds: 2,
                visual_diff_threshold_percent: 5.0,
                capture_subpages: true,
                exclude_page_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            },
            baselines: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn excludes_case_insensitive_substring() {
        let site = site(&["ADMIN"]);
        assert!(site.is_page_excluded("https://example.com/Admin/login"));
        assert!(!site.is_page_excluded("https://example.com/blog/post"));
    }

    #[test]
    fn no_baselines_by_default() {
        let site = site(&[]);
        assert!(!site.has_baselines());
    }
}
