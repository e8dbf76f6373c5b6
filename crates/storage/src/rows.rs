use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::Row;
use wm_domain::error::{Error, Result};
use wm_domain::{Baseline, CheckParameters, FeatureFlags, Website};

/// Parse a JSON column, degrading to the default value rather than aborting
/// the read when the stored JSON is corrupted (spec §4.1 failure semantics).
fn json_or_default<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "corrupted JSON column, degrading to default");
        T::default()
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Sqlite(format!("invalid timestamp {raw:?}: {e}")))
}

pub fn website_from_row(row: &Row<'_>) -> rusqlite::Result<Website> {
    let tags_raw: String = row.get("tags")?;
    let recipients_raw: String = row.get("notification_recipients")?;
    let keywords_raw: String = row.get("exclude_page_keywords")?;
    let baselines_raw: String = row.get("baselines")?;
    let created_at_raw: String = row.get("created_at")?;
    let updated_at_raw: String = row.get("updated_at")?;

    let tags: BTreeSet<String> = json_or_default(&tags_raw);
    let notification_recipients: Vec<String> = json_or_default(&recipients_raw);
    let exclude_page_keywords: Vec<String> = json_or_default(&keywords_raw);
    let baselines: BTreeMap<String, Baseline> = json_or_default(&baselines_raw);

    Ok(Website {
        id: row.get("id")?,
        url: row.get("url")?,
        display_name: row.get("display_name")?,
        cadence_minutes: row.get::<_, i64>("cadence_minutes")? as u32,
        is_active: row.get::<_, i64>("is_active")? != 0,
        tags,
        notification_recipients,
        flags: FeatureFlags {
            crawl_enabled: row.get::<_, i64>("crawl_enabled")? != 0,
            visual_enabled: row.get::<_, i64>("visual_enabled")? != 0,
            blur_enabled: row.get::<_, i64>("blur_enabled")? != 0,
            performance_enabled: row.get::<_, i64>("performance_enabled")? != 0,
            full_check_enabled: row.get::<_, i64>("full_check_enabled")? != 0,
        },
        params: CheckParameters {
            max_crawl_depth: row.get::<_, i64>("max_crawl_depth")? as u32,
            render_delay_seconds: row.get::<_, i64>("render_delay_seconds")? as u32,
            visual_diff_threshold_percent: row.get("visual_diff_threshold_percent")?,
            capture_subpages: row.get::<_, i64>("capture_subpages")? != 0,
            exclude_page_keywords,
        },
        baselines,
        created_at: parse_timestamp(&created_at_raw)
            .unwrap_or_else(|_| Utc::now()),
        updated_at: parse_timestamp(&updated_at_raw)
            .unwrap_or_else(|_| Utc::now()),
    })
}
