use std::path::{Path, PathBuf};

use wm_domain::error::{Error, Result};
use wm_domain::slug::slugify;

/// Owns the on-disk snapshot tree for one website (spec §3):
/// `<data>/snapshots/<host_slug>/<website_id>/{baseline,visual,diffs,blur_images}/...`
pub struct SnapshotLayout {
    root: PathBuf,
}

/// Extract the host from a website's `url`, for the snapshot tree's
/// `<host_slug>` path component (spec §3). Best-effort: falls back to the
/// input verbatim on a malformed URL rather than failing a cleanup.
pub fn host_of(url: &str) -> &str {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

impl SnapshotLayout {
    pub fn new(snapshot_directory: &Path, host: &str, website_id: &str) -> Self {
        Self {
            root: snapshot_directory.join(slugify(host)).join(website_id),
        }
    }

    pub fn website_root(&self) -> &Path {
        &self.root
    }

    pub fn baseline_path(&self, page_url: &str) -> PathBuf {
        self.root.join("baseline").join(format!("baseline_{}.png", slugify(page_url)))
    }

    pub fn visual_path(&self, page_url: &str, timestamp: &str) -> PathBuf {
        self.root.join("visual").join(format!("{timestamp}_{}.png", slugify(page_url)))
    }

    pub fn diff_path(&self, page_url: &str, timestamp: &str) -> PathBuf {
        self.root.join("diffs").join(format!("{timestamp}_{}.png", slugify(page_url)))
    }

    pub fn blur_image_path(&self, image_hash: &str) -> PathBuf {
        self.root.join("blur_images").join(format!("{image_hash}.png"))
    }

    /// Write `bytes` to `path` atomically: write to a sibling temp file then
    /// rename over the destination, so readers never observe a partial file
    /// (spec §5, snapshot filesystem as the Dispatcher's exclusive write domain).
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path.parent().ok_or_else(|| Error::other("snapshot path has no parent"))?;
        std::fs::create_dir_all(parent)?;

        let tmp_name = format!(
            ".{}.tmp-{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("snapshot"),
            uuid::Uuid::new_v4()
        );
        let tmp_path = parent.join(tmp_name);
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Remove this website's entire snapshot subtree (cascade on deletion,
    /// spec §3). Idempotent: missing directories are not an error.
    pub fn remove_all(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
