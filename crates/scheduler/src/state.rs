use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wm_domain::error::Result;

/// One entry of the persisted job set (spec §3 "Scheduler State").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledWebsiteInfo {
    pub name: String,
    pub url: String,
    pub cadence_minutes: u32,
    pub scheduled_at: DateTime<Utc>,
}

/// Durable snapshot of the Scheduler Core's job set and health, rewritten on
/// every add/remove/error so a restart resumes without losing or
/// duplicating work.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub last_schedule_at: Option<DateTime<Utc>>,
    pub scheduled_websites: BTreeMap<String, ScheduledWebsiteInfo>,
    pub consecutive_error_count: u32,
    pub last_error_at: Option<DateTime<Utc>>,
    pub is_running: bool,
}

impl PersistedState {
    /// Loads the state file, or an empty default if it does not exist yet
    /// (first run against a fresh data directory).
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: serialize to a sibling temp file, then rename over the
    /// destination, so a crash mid-write never leaves a truncated state
    /// file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler_state.json");
        let state = PersistedState::load(&path).unwrap();
        assert!(state.scheduled_websites.is_empty());
        assert_eq!(state.consecutive_error_count, 0);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler_state.json");

        let mut state = PersistedState::default();
        state.is_running = true;
        state.consecutive_error_count = 2;
        state.scheduled_websites.insert(
            "site-1".to_string(),
            ScheduledWebsiteInfo {
                name: "Example".to_string(),
                url: "https://example.com".to_string(),
                cadence_minutes: 60,
                scheduled_at: Utc::now(),
            },
        );
        state.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = PersistedState::load(&path).unwrap();
        assert_eq!(loaded.scheduled_websites.len(), 1);
        assert_eq!(loaded.consecutive_error_count, 2);
        assert!(loaded.is_running);
    }
}
