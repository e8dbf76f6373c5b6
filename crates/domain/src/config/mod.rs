mod notification;
mod retention;
mod scheduler;
mod storage;

pub use notification::*;
pub use retention::*;
pub use scheduler::*;
pub use storage::*;

use serde::{Deserialize, Serialize};

/// Fixed prefix for environment-variable overrides, e.g. `WM_DATABASE_PATH`.
pub const ENV_PREFIX: &str = "WM_";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub checks: CheckDefaultsConfig,
}

impl Config {
    /// Load from a TOML file, then apply `WM_`-prefixed environment
    /// variable overrides (environment wins). `dashboard_url` additionally
    /// honors the unprefixed `DASHBOARD_URL` variable, which takes
    /// precedence over everything else — this is an explicit fix of the
    /// inconsistent behavior in the system this was modeled on.
    pub fn load(path: Option<&std::path::Path>) -> crate::error::Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)
                    .map_err(|e| crate::error::Error::Config(format!("{}: {e}", p.display())))?
            }
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_var("DATABASE_PATH") {
            self.storage.database_path = v.into();
        }
        if let Some(v) = env_var("SNAPSHOT_DIRECTORY") {
            self.storage.snapshot_directory = v.into();
        }
        if let Some(v) = env_var("DEFAULT_NOTIFICATION_RECIPIENTS") {
            self.notification.default_notification_recipients = split_csv(&v);
        }
        if let Some(v) = env_var("NOTIFICATION_SENDER") {
            self.notification.notification_sender = v;
        }
        if let Some(v) = env_var("SMTP_HOST") {
            self.notification.smtp_host = v;
        }
        if let Some(v) = env_var("SMTP_PORT") {
            if let Ok(p) = v.parse() {
                self.notification.smtp_port = p;
            }
        }
        if let Some(v) = env_var("SMTP_USERNAME") {
            self.notification.smtp_username = Some(v);
        }
        if let Some(v) = env_var("SMTP_PASSWORD") {
            self.notification.smtp_password = Some(v);
        }
        if let Some(v) = env_var("SMTP_USE_TLS") {
            self.notification.smtp_use_tls = parse_bool(&v);
        }
        if let Some(v) = env_var("SMTP_USE_SSL") {
            self.notification.smtp_use_ssl = parse_bool(&v);
        }
        if let Some(v) = env_var("SCHEDULER_ENABLED") {
            self.scheduler.scheduler_enabled = parse_bool(&v);
        }
        if let Some(v) = env_var("HISTORY_RETENTION_DAYS") {
            if let Ok(d) = v.parse() {
                self.retention.history_retention_days = d;
            }
        }
        if let Some(v) = env_var("QUEUE_RETENTION_DAYS") {
            if let Ok(d) = v.parse() {
                self.retention.queue_retention_days = d;
            }
        }
        if let Some(v) = env_var("MAX_CRAWL_DEPTH") {
            if let Ok(d) = v.parse() {
                self.checks.max_crawl_depth = d;
            }
        }
        if let Some(v) = env_var("RENDER_DELAY_SECONDS") {
            if let Ok(d) = v.parse() {
                self.checks.render_delay_seconds = d;
            }
        }
        if let Some(v) = env_var("VISUAL_DIFF_THRESHOLD_PERCENT") {
            if let Ok(d) = v.parse() {
                self.checks.visual_diff_threshold_percent = d;
            }
        }
        if let Some(v) = env_var("EXCLUDE_PAGE_KEYWORDS") {
            self.checks.exclude_page_keywords = split_csv(&v);
        }

        // `dashboard_url`: unprefixed env var wins over everything, per the
        // spec's explicit fix of the source's inconsistent precedence here.
        if let Ok(v) = std::env::var("DASHBOARD_URL") {
            if !v.is_empty() {
                self.notification.dashboard_url = v;
            }
        } else if let Some(v) = env_var("DASHBOARD_URL") {
            self.notification.dashboard_url = v;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
