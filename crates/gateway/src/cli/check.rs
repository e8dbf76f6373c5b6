//! `website-monitor check <website-id> <check-type>` — enqueues a single
//! manual check against a running instance's queue table and exits. Does
//! not start the scheduler or queue processor; a running `website-monitor
//! run` instance is expected to drain the row.

use std::sync::Arc;

use wm_domain::config::Config;
use wm_domain::CheckType;
use wm_storage::Monitor;

pub fn run(config: Arc<Config>, website_id: &str, check_type: &str) -> anyhow::Result<()> {
    let check_type = CheckType::parse(check_type)
        .ok_or_else(|| anyhow::anyhow!("unknown check type {check_type:?}; expected one of crawl, visual, blur, performance, full, baseline"))?;

    let monitor = Monitor::open(&config.storage.database_path)?;
    monitor.catalog.get(website_id)?;
    let queue_id = monitor.catalog.enqueue(website_id, check_type, Some("cli".to_string()))?;

    println!("enqueued {} check for {website_id} as {queue_id}", check_type.as_str());
    Ok(())
}
