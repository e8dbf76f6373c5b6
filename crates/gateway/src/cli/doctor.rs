//! `website-monitor doctor` — a lightweight, read-only diagnostic akin to
//! the teacher's `cli/doctor.rs`: scheduler-lock status, pending-queue
//! depth, and the five most recent history records across all websites.

use wm_domain::config::Config;
use wm_storage::{Monitor, QueueFilter};

pub fn run(config: &Config) -> anyhow::Result<()> {
    println!("website-monitor doctor");
    println!("=======================\n");

    check_lock_file(&config.storage.lock_file_path);

    let monitor = Monitor::open(&config.storage.database_path)?;

    let pending = monitor
        .catalog
        .list_pending(&QueueFilter { website_id: None, status: Some(wm_domain::QueueStatus::Pending) })?;
    println!("pending queue items: {}", pending.len());

    let websites = monitor.catalog.list(&Default::default())?;
    println!("registered websites: {} ({} active)", websites.len(), websites.iter().filter(|w| w.is_active).count());

    let mut recent: Vec<_> = websites
        .iter()
        .map(|w| monitor.history.list_recent(&w.id, 5))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(5);

    println!("\nmost recent checks:");
    if recent.is_empty() {
        println!("  (none)");
    }
    for record in &recent {
        println!(
            "  {} {} website={} manual={} status={:?}",
            record.timestamp.to_rfc3339(),
            record.id,
            record.website_id,
            record.is_manual,
            record.status,
        );
    }

    Ok(())
}

fn check_lock_file(path: &std::path::Path) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let age = meta
                .modified()
                .ok()
                .and_then(|t| t.elapsed().ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            println!("scheduler lock: present at {} (age {age}s)", path.display());
        }
        Err(_) => println!("scheduler lock: absent ({} not found)", path.display()),
    }
}
