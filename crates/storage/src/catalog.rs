use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use wm_domain::error::{Error, Result};
use wm_domain::{CheckConfig, CheckType, Priority, QueueItem, QueueStatus, Website};

use crate::cache::WebsiteCache;
use crate::rows::website_from_row;
use crate::schema;

/// Filter for `Store::list`.
#[derive(Debug, Clone, Default)]
pub struct WebsiteFilter {
    pub active: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

/// Filter for `Store::list_pending`.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub website_id: Option<String>,
    pub status: Option<QueueStatus>,
}

type DeletedHook = Box<dyn Fn(&str, &str) + Send + Sync>;

/// The Catalog Store: websites + the manual-check queue, backed by a single
/// SQLite database shared with the History Store (spec §2, §4.1).
///
/// All access is serialized behind one `Mutex<Connection>` — simpler than
/// the spec's conceptual multi-reader/single-writer split, and still
/// correct; see DESIGN.md / SPEC_FULL.md §9 for the tradeoff.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    cache: WebsiteCache,
    on_website_deleted: Mutex<Vec<DeletedHook>>,
}

impl Store {
    /// Build a Catalog Store over a connection already migrated by the
    /// caller (the `Monitor` façade shares one connection between the
    /// Catalog Store and the History Store).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            cache: WebsiteCache::new(),
            on_website_deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Sqlite(e.to_string()))?;
        schema::migrate(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// In-memory store, for tests and the `doctor` CLI dry run.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Sqlite(e.to_string()))?;
        schema::migrate(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// Register a hook invoked (with the website id and its url, captured
    /// just before the row was removed) after a `delete` commits. One-way
    /// push from Catalog Store to Scheduler Core and to the Dispatcher's
    /// snapshot cleanup — avoids the cyclic-ownership problem noted in
    /// spec §9. The url is passed through because the snapshot tree's path
    /// depends on the website's host slug, which is no longer readable from
    /// the store once the row is gone.
    pub fn on_website_deleted(&self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_website_deleted.lock().push(Box::new(hook));
    }

    // ── Websites ─────────────────────────────────────────────────────

    pub fn list(&self, filter: &WebsiteFilter) -> Result<Vec<Website>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT * FROM websites ORDER BY id")
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let rows = stmt
            .query_map([], website_from_row)
            .map_err(|e| Error::Sqlite(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let site = row.map_err(|e| Error::Sqlite(e.to_string()))?;
            if let Some(active) = filter.active {
                if site.is_active != active {
                    continue;
                }
            }
            if let Some(tag) = &filter.tag {
                if !site.tags.contains(tag) {
                    continue;
                }
            }
            if let Some(search) = &filter.search {
                let needle = search.to_ascii_lowercase();
                if !site.url.to_ascii_lowercase().contains(&needle)
                    && !site.display_name.to_ascii_lowercase().contains(&needle)
                {
                    continue;
                }
            }
            out.push(site);
        }
        Ok(out)
    }

    pub fn get(&self, id: &str) -> Result<Website> {
        if let Some(site) = self.cache.get(id) {
            return Ok(site);
        }
        let conn = self.conn.lock();
        let site = conn
            .query_row("SELECT * FROM websites WHERE id = ?1", params![id], website_from_row)
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("website {id}")))?;
        drop(conn);
        self.cache.put(site.clone());
        Ok(site)
    }

    /// Replace a website by id, atomically bumping `updated_at`.
    pub fn upsert(&self, mut website: Website) -> Result<Website> {
        website.updated_at = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO websites (
                id, url, display_name, cadence_minutes, is_active, tags,
                notification_recipients, crawl_enabled, visual_enabled,
                blur_enabled, performance_enabled, full_check_enabled,
                max_crawl_depth, render_delay_seconds,
                visual_diff_threshold_percent, capture_subpages,
                exclude_page_keywords, baselines, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)
            ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                display_name = excluded.display_name,
                cadence_minutes = excluded.cadence_minutes,
                is_active = excluded.is_active,
                tags = excluded.tags,
                notification_recipients = excluded.notification_recipients,
                crawl_enabled = excluded.crawl_enabled,
                visual_enabled = excluded.visual_enabled,
                blur_enabled = excluded.blur_enabled,
                performance_enabled = excluded.performance_enabled,
                full_check_enabled = excluded.full_check_enabled,
                max_crawl_depth = excluded.max_crawl_depth,
                render_delay_seconds = excluded.render_delay_seconds,
                visual_diff_threshold_percent = excluded.visual_diff_threshold_percent,
                capture_subpages = excluded.capture_subpages,
                exclude_page_keywords = excluded.exclude_page_keywords,
                baselines = excluded.baselines,
                updated_at = excluded.updated_at",
            params![
                website.id,
                website.url,
                website.display_name,
                website.cadence_minutes,
                website.is_active as i64,
                serde_json::to_string(&website.tags)?,
                serde_json::to_string(&website.notification_recipients)?,
                website.flags.crawl_enabled as i64,
                website.flags.visual_enabled as i64,
                website.flags.blur_enabled as i64,
                website.flags.performance_enabled as i64,
                website.flags.full_check_enabled as i64,
                website.params.max_crawl_depth,
                website.params.render_delay_seconds,
                website.params.visual_diff_threshold_percent,
                website.params.capture_subpages as i64,
                serde_json::to_string(&website.params.exclude_page_keywords)?,
                serde_json::to_string(&website.baselines)?,
                website.created_at.to_rfc3339(),
                website.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        drop(conn);
        self.cache.put(website.clone());
        Ok(website)
    }

    /// Update only the baseline map and `updated_at`, invalidating just
    /// this website's cache entry (spec §9 cache-coherency note).
    pub fn update_baselines(
        &self,
        id: &str,
        baselines: std::collections::BTreeMap<String, wm_domain::Baseline>,
    ) -> Result<()> {
        let now = Utc::now();
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE websites SET baselines = ?1, updated_at = ?2 WHERE id = ?3",
                params![serde_json::to_string(&baselines)?, now.to_rfc3339(), id],
            )
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        drop(conn);
        if changed == 0 {
            return Err(Error::NotFound(format!("website {id}")));
        }
        self.cache.invalidate(id);
        Ok(())
    }

    /// Idempotent cascade delete: history rows, queue rows, the website row
    /// itself, and a call to the registered deletion hooks (scheduler
    /// teardown, filesystem cleanup is the dispatcher's job via the same
    /// hook mechanism at the call site). A website that never existed is not
    /// an error — `url` is simply empty in that case, which the filesystem
    /// cleanup hook tolerates (nothing was ever written under it).
    pub fn delete(&self, id: &str) -> Result<()> {
        let url = self.get(id).map(|site| site.url).unwrap_or_default();
        {
            let conn = self.conn.lock();
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| Error::Sqlite(e.to_string()))?;
            tx.execute("DELETE FROM check_history WHERE website_id = ?1", params![id])
                .map_err(|e| Error::Sqlite(e.to_string()))?;
            tx.execute(
                "DELETE FROM manual_check_queue WHERE website_id = ?1",
                params![id],
            )
            .map_err(|e| Error::Sqlite(e.to_string()))?;
            tx.execute("DELETE FROM websites WHERE id = ?1", params![id])
                .map_err(|e| Error::Sqlite(e.to_string()))?;
            tx.commit().map_err(|e| Error::Sqlite(e.to_string()))?;
        }
        self.cache.invalidate(id);
        for hook in self.on_website_deleted.lock().iter() {
            hook(id, &url);
        }
        Ok(())
    }

    pub fn get_manual_check_config(&self, id: &str, check_type: CheckType) -> Result<CheckConfig> {
        let site = self.get(id)?;
        Ok(CheckConfig::for_manual(check_type, site.flags, site.has_baselines()))
    }

    pub fn get_automated_check_config(&self, id: &str) -> Result<CheckConfig> {
        let site = self.get(id)?;
        Ok(CheckConfig::for_automated(site.flags))
    }

    // ── Manual-check queue ───────────────────────────────────────────

    /// Enqueue an operator-requested check at manual priority. Idempotent:
    /// if an active (pending/processing) row already exists for
    /// `(website_id, check_type)` its id is returned instead of inserting a
    /// duplicate (spec §4.1, invariant 1 in §8).
    pub fn enqueue(
        &self,
        website_id: &str,
        check_type: CheckType,
        requested_by: Option<String>,
    ) -> Result<String> {
        self.enqueue_with_priority(website_id, check_type, requested_by, Priority::MANUAL)
    }

    /// As `enqueue`, but lets the caller pick the priority. The queue only
    /// ever drains rows the Queue Processor itself inserted at
    /// `Priority::MANUAL`; a lower, scheduled priority exists in the model
    /// for completeness and is used by tests that simulate a scheduled
    /// check contending with manual ones (spec §8 "priority ordering").
    pub fn enqueue_with_priority(
        &self,
        website_id: &str,
        check_type: CheckType,
        requested_by: Option<String>,
        priority: Priority,
    ) -> Result<String> {
        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM manual_check_queue
                 WHERE website_id = ?1 AND check_type = ?2
                   AND status IN ('pending', 'processing')
                 ORDER BY created_at LIMIT 1",
                params![website_id, check_type.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let mut item = QueueItem::new(website_id, check_type, requested_by);
        item.priority = priority;
        conn.execute(
            "INSERT INTO manual_check_queue
                (id, website_id, check_type, status, priority, requested_by, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                item.id,
                item.website_id,
                item.check_type.as_str(),
                item.status.as_str(),
                item.priority.0,
                item.requested_by,
                item.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(item.id)
    }

    /// Select (but do not mark) the highest-priority, oldest pending row.
    /// Marking is the Queue Processor's responsibility via `update_status`.
    pub fn dequeue_next(&self) -> Result<Option<QueueItem>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM manual_check_queue
             WHERE status = 'pending'
             ORDER BY priority DESC, created_at ASC
             LIMIT 1",
            [],
            queue_item_from_row,
        )
        .optional()
        .map_err(|e| Error::Sqlite(e.to_string()))
    }

    pub fn update_status(
        &self,
        queue_id: &str,
        new_status: QueueStatus,
        error: Option<String>,
        payload: Option<serde_json::Value>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        let payload_raw = payload.map(|p| p.to_string());
        let changed = match new_status {
            QueueStatus::Processing => conn.execute(
                "UPDATE manual_check_queue
                 SET status = ?1, started_at = ?2
                 WHERE id = ?3",
                params![new_status.as_str(), now, queue_id],
            ),
            QueueStatus::Completed | QueueStatus::Failed => conn.execute(
                "UPDATE manual_check_queue
                 SET status = ?1, completed_at = ?2, error_message = ?3, result_payload = ?4
                 WHERE id = ?5",
                params![new_status.as_str(), now, error, payload_raw, queue_id],
            ),
            QueueStatus::Pending => conn.execute(
                "UPDATE manual_check_queue SET status = ?1 WHERE id = ?2",
                params![new_status.as_str(), queue_id],
            ),
        }
        .map_err(|e| Error::Sqlite(e.to_string()))?;
        if changed == 0 {
            return Err(Error::NotFound(format!("queue item {queue_id}")));
        }
        Ok(())
    }

    pub fn list_pending(&self, filter: &QueueFilter) -> Result<Vec<QueueItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT * FROM manual_check_queue ORDER BY priority DESC, created_at ASC")
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let rows = stmt
            .query_map([], queue_item_from_row)
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            let item = row.map_err(|e| Error::Sqlite(e.to_string()))?;
            if let Some(wid) = &filter.website_id {
                if &item.website_id != wid {
                    continue;
                }
            }
            if let Some(status) = filter.status {
                if item.status != status {
                    continue;
                }
            }
            out.push(item);
        }
        Ok(out)
    }

    /// Remove completed/failed rows older than `age`.
    pub fn prune_old(&self, age: chrono::Duration) -> Result<usize> {
        let cutoff = (Utc::now() - age).to_rfc3339();
        let conn = self.conn.lock();
        let n = conn
            .execute(
                "DELETE FROM manual_check_queue
                 WHERE status IN ('completed', 'failed') AND completed_at < ?1",
                params![cutoff],
            )
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(n)
    }

    /// Operator-recovery escape hatch: drop all pending/processing rows.
    pub fn clear_active(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let n = conn
            .execute(
                "DELETE FROM manual_check_queue WHERE status IN ('pending', 'processing')",
                [],
            )
            .map_err(|e| Error::Sqlite(e.to_string()))?;
        Ok(n)
    }
}

fn queue_item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    let check_type_raw: String = row.get("check_type")?;
    let status_raw: String = row.get("status")?;
    let created_at_raw: String = row.get("created_at")?;
    let started_at_raw: Option<String> = row.get("started_at")?;
    let completed_at_raw: Option<String> = row.get("completed_at")?;
    let payload_raw: Option<String> = row.get("result_payload")?;

    Ok(QueueItem {
        id: row.get("id")?,
        website_id: row.get("website_id")?,
        check_type: CheckType::parse(&check_type_raw).unwrap_or(CheckType::Crawl),
        status: QueueStatus::parse(&status_raw).unwrap_or(QueueStatus::Pending),
        priority: Priority(row.get::<_, i64>("priority")? as u8),
        requested_by: row.get("requested_by")?,
        created_at: parse_rfc3339_or_now(&created_at_raw),
        started_at: started_at_raw.as_deref().map(parse_rfc3339_or_now),
        completed_at: completed_at_raw.as_deref().map(parse_rfc3339_or_now),
        error_message: row.get("error_message")?,
        result_payload: payload_raw.and_then(|p| serde_json::from_str(&p).ok()),
    })
}

fn parse_rfc3339_or_now(raw: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
