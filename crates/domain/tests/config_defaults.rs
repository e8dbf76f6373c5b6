use wm_domain::Config;

#[test]
fn default_smtp_port_is_587() {
    let config = Config::default();
    assert_eq!(config.notification.smtp_port, 587);
}

#[test]
fn explicit_smtp_port_parses() {
    let toml_str = r#"
[notification]
smtp_host = "smtp.example.com"
smtp_port = 465
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.notification.smtp_port, 465);
}

#[test]
fn default_scheduler_enabled_is_true() {
    let config = Config::default();
    assert!(config.scheduler.scheduler_enabled);
}

#[test]
fn default_retention_days_match_spec() {
    let config = Config::default();
    assert_eq!(config.retention.queue_retention_days, 7);
}
