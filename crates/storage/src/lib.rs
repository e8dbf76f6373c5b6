//! Persistence layer for the website-monitor control plane: the Catalog
//! Store (websites + manual-check queue) and the History Store (completed
//! check records), both backed by one embedded SQLite database (spec §2,
//! §4.1). `Monitor` is the façade other crates depend on.

mod cache;
mod catalog;
mod history;
mod rows;
mod schema;

pub use catalog::{QueueFilter, Store, WebsiteFilter};
pub use history::HistoryStore;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use wm_domain::error::{Error, Result};

/// Owns the single database connection and hands out the Catalog Store and
/// History Store views over it.
pub struct Monitor {
    pub catalog: Store,
    pub history: HistoryStore,
}

impl Monitor {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Sqlite(e.to_string()))?;
        schema::migrate(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            catalog: Store::from_connection(conn.clone()),
            history: HistoryStore::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Sqlite(e.to_string()))?;
        schema::migrate(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            catalog: Store::from_connection(conn.clone()),
            history: HistoryStore::new(conn),
        })
    }
}
