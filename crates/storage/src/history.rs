use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use wm_domain::error::{Error, Result};
use wm_domain::{
    BlurSummary, CheckRecord, CheckStatus, CrawlSummary, PerformanceSummary, VisualSummary,
};

/// Append-only store of completed/failed check runs, sharing the same
/// connection and database file as the Catalog Store (spec §2: "one
/// embedded database").
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, record: &CheckRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO check_history
                (id, website_id, timestamp, status, is_manual, is_change_report,
                 crawl, visual, blur, performance, error_message)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                record.id,
                record.website_id,
                record.timestamp.to_rfc3339(),
                status_str(record.status),
                record.is_manual as i64,
                record.is_change_report as i64,
                record.crawl.as_ref().map(serde_json::to_string).transpose()?,
                record.visual.as_ref().map(serde_json::to_string).transpose()?,
                record.blur.as_ref().map(serde_json::to_string).transpose()?,
                record.performance.as_ref().map(serde_json::to_string).transpose()?,
                record.error_message,
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(())
    }

    /// Most recent `limit` records for a website, newest first.
    pub fn list_recent(&self, website_id: &str, limit: usize) -> Result<Vec<CheckRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT * FROM check_history WHERE website_id = ?1
                 ORDER BY timestamp DESC LIMIT ?2",
            )
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let rows = stmt
            .query_map(params![website_id, limit as i64], check_record_from_row)
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| Error::Sqlite(e.to_string()))?);
        }
        Ok(out)
    }

    /// The most recent record regardless of status, used to decide whether
    /// a Full check should be treated as a change report (spec §4.4).
    pub fn latest(&self, website_id: &str) -> Result<Option<CheckRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM check_history WHERE website_id = ?1
             ORDER BY timestamp DESC LIMIT 1",
            params![website_id],
            check_record_from_row,
        )
        .optional()
        .map_err(|e| Error::Sqlite(e.to_string()))
    }

    pub fn prune_old(&self, retention: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - retention).to_rfc3339();
        let conn = self.conn.lock();
        let n = conn
            .execute("DELETE FROM check_history WHERE timestamp < ?1", params![cutoff])
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(n)
    }
}

fn status_str(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Completed => "completed",
        CheckStatus::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> CheckStatus {
    match raw {
        "failed" => CheckStatus::Failed,
        _ => CheckStatus::Completed,
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn check_record_from_row(row: &Row<'_>) -> rusqlite::Result<CheckRecord> {
    let status_raw: String = row.get("status")?;
    let timestamp_raw: String = row.get("timestamp")?;
    let crawl_raw: Option<String> = row.get("crawl")?;
    let visual_raw: Option<String> = row.get("visual")?;
    let blur_raw: Option<String> = row.get("blur")?;
    let performance_raw: Option<String> = row.get("performance")?;

    Ok(CheckRecord {
        id: row.get("id")?,
        website_id: row.get("website_id")?,
        timestamp: parse_timestamp(&timestamp_raw),
        status: parse_status(&status_raw),
        is_manual: row.get::<_, i64>("is_manual")? != 0,
        is_change_report: row.get::<_, i64>("is_change_report")? != 0,
        crawl: crawl_raw.and_then(|s| serde_json::from_str::<CrawlSummary>(&s).ok()),
        visual: visual_raw.and_then(|s| serde_json::from_str::<VisualSummary>(&s).ok()),
        blur: blur_raw.and_then(|s| serde_json::from_str::<BlurSummary>(&s).ok()),
        performance: performance_raw
            .and_then(|s| serde_json::from_str::<PerformanceSummary>(&s).ok()),
        error_message: row.get("error_message")?,
    })
}
