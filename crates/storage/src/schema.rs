use rusqlite::Connection;
use wm_domain::error::{Error, Result};

/// Create tables if absent, then apply additive migrations (new nullable
/// columns) without requiring a separate migration tool, per spec §4.1
/// "Schema evolution".
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS websites (
            id                  TEXT PRIMARY KEY,
            url                 TEXT NOT NULL,
            display_name        TEXT NOT NULL,
            cadence_minutes     INTEGER NOT NULL,
            is_active           INTEGER NOT NULL,
            tags                TEXT NOT NULL DEFAULT '[]',
            notification_recipients TEXT NOT NULL DEFAULT '[]',
            crawl_enabled       INTEGER NOT NULL DEFAULT 0,
            visual_enabled      INTEGER NOT NULL DEFAULT 0,
            blur_enabled        INTEGER NOT NULL DEFAULT 0,
            performance_enabled INTEGER NOT NULL DEFAULT 0,
            full_check_enabled  INTEGER NOT NULL DEFAULT 0,
            max_crawl_depth     INTEGER NOT NULL DEFAULT 3,
            render_delay_seconds INTEGER NOT NULL DEFAULT 2,
            visual_diff_threshold_percent REAL NOT NULL DEFAULT 5.0,
            capture_subpages    INTEGER NOT NULL DEFAULT 1,
            exclude_page_keywords TEXT NOT NULL DEFAULT '[]',
            baselines           TEXT NOT NULL DEFAULT '{}',
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS manual_check_queue (
            id              TEXT PRIMARY KEY,
            website_id      TEXT NOT NULL,
            check_type      TEXT NOT NULL,
            status          TEXT NOT NULL,
            priority        INTEGER NOT NULL,
            requested_by    TEXT,
            created_at      TEXT NOT NULL,
            started_at      TEXT,
            completed_at    TEXT,
            error_message   TEXT,
            result_payload  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_queue_active
            ON manual_check_queue (website_id, check_type, status);

        CREATE TABLE IF NOT EXISTS check_history (
            id                  TEXT PRIMARY KEY,
            website_id          TEXT NOT NULL,
            timestamp           TEXT NOT NULL,
            status              TEXT NOT NULL,
            is_manual           INTEGER NOT NULL,
            is_change_report    INTEGER NOT NULL,
            crawl               TEXT,
            visual              TEXT,
            blur                TEXT,
            performance         TEXT,
            error_message       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_history_website_ts
            ON check_history (website_id, timestamp);
        ",
    )
    .map_err(|e| Error::Sqlite(e.to_string()))?;

    Ok(())
}
