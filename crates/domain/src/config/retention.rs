use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retention & check defaults
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "d_30")]
    pub history_retention_days: u32,
    #[serde(default = "d_7")]
    pub queue_retention_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            history_retention_days: 30,
            queue_retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDefaultsConfig {
    #[serde(default = "d_render_delay")]
    pub render_delay_seconds: u32,
    #[serde(default = "d_diff_threshold")]
    pub visual_diff_threshold_percent: f64,
    #[serde(default = "d_max_depth")]
    pub max_crawl_depth: u32,
    #[serde(default)]
    pub exclude_page_keywords: Vec<String>,
}

impl Default for CheckDefaultsConfig {
    fn default() -> Self {
        Self {
            render_delay_seconds: d_render_delay(),
            visual_diff_threshold_percent: d_diff_threshold(),
            max_crawl_depth: d_max_depth(),
            exclude_page_keywords: Vec::new(),
        }
    }
}

fn d_30() -> u32 {
    30
}
fn d_7() -> u32 {
    7
}
fn d_render_delay() -> u32 {
    2
}
fn d_diff_threshold() -> f64 {
    5.0
}
fn d_max_depth() -> u32 {
    3
}
