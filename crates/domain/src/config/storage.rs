use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "d_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "d_snapshot_directory")]
    pub snapshot_directory: PathBuf,
    #[serde(default = "d_lock_file_path")]
    pub lock_file_path: PathBuf,
    #[serde(default = "d_scheduler_state_path")]
    pub scheduler_state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: d_database_path(),
            snapshot_directory: d_snapshot_directory(),
            lock_file_path: d_lock_file_path(),
            scheduler_state_path: d_scheduler_state_path(),
        }
    }
}

fn d_database_path() -> PathBuf {
    "data/monitor.db".into()
}
fn d_snapshot_directory() -> PathBuf {
    "data/snapshots".into()
}
fn d_lock_file_path() -> PathBuf {
    "data/scheduler.lock".into()
}
fn d_scheduler_state_path() -> PathBuf {
    "data/scheduler_state.json".into()
}
