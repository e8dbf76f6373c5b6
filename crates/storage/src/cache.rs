use std::collections::HashMap;

use parking_lot::RwLock;
use wm_domain::Website;

/// Read-through cache of `Website` rows, keyed by id. Mirrors the teacher's
/// `RwLock<HashMap<..>>` session/task-store shape. `invalidate` removes a
/// single entry — mutations that only touch one website (baseline updates,
/// in particular) must never clear the whole cache, per spec §9.
#[derive(Default)]
pub struct WebsiteCache {
    entries: RwLock<HashMap<String, Website>>,
}

impl WebsiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Website> {
        self.entries.read().get(id).cloned()
    }

    pub fn put(&self, website: Website) {
        self.entries.write().insert(website.id.clone(), website);
    }

    pub fn invalidate(&self, id: &str) {
        self.entries.write().remove(id);
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};
    use wm_domain::{CheckParameters, FeatureFlags};

    fn site(id: &str) -> Website {
        Website {
            id: id.into(),
            url: "https://example.com".into(),
            display_name: "Example".into(),
            cadence_minutes: 60,
            is_active: true,
            tags: BTreeSet::new(),
            notification_recipients: vec![],
            flags: FeatureFlags::default(),
            params: CheckParameters {
                max_crawl_depth: 3,
                render_delay_seconds: 2,
                visual_diff_threshold_percent: 5.0,
                capture_subpages: true,
                exclude_page_keywords: vec![],
            },
            baselines: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn invalidate_removes_only_one_entry() {
        let cache = WebsiteCache::new();
        cache.put(site("a"));
        cache.put(site("b"));
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
    }
}
