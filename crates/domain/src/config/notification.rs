use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notification / SMTP transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub default_notification_recipients: Vec<String>,
    #[serde(default = "d_sender")]
    pub notification_sender: String,
    #[serde(default = "d_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "d_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "d_true")]
    pub smtp_use_tls: bool,
    #[serde(default)]
    pub smtp_use_ssl: bool,
    #[serde(default = "d_dashboard_url")]
    pub dashboard_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_notification_recipients: Vec::new(),
            notification_sender: d_sender(),
            smtp_host: d_smtp_host(),
            smtp_port: d_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_use_tls: true,
            smtp_use_ssl: false,
            dashboard_url: d_dashboard_url(),
        }
    }
}

fn d_sender() -> String {
    "monitor@localhost".into()
}
fn d_smtp_host() -> String {
    "localhost".into()
}
fn d_smtp_port() -> u16 {
    587
}
fn d_true() -> bool {
    true
}
fn d_dashboard_url() -> String {
    "http://localhost:8000".into()
}
