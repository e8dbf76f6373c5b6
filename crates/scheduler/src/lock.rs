use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use wm_domain::error::{Error, Result};

/// Singleton enforcement for the Scheduler Core (spec §4.2), generalized
/// from the teacher's `cli/pid.rs` PID-file-plus-`fs2`-exclusive-lock
/// pattern: a live holder blocks `try_lock_exclusive` outright (the OS
/// releases the advisory lock when that process dies, so a dead holder
/// never blocks us); a lock file left behind without the OS having released
/// it (e.g. certain network filesystems) is reclaimed once it is older than
/// `stale_after`.
pub struct SchedulerLock {
    file: File,
    path: PathBuf,
}

impl SchedulerLock {
    pub fn acquire(path: &Path, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                write_identity(&file)?;
                Ok(Self { file, path: path.to_path_buf() })
            }
            Err(_) => {
                let age = fs::metadata(path)
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|t| t.elapsed().ok())
                    .unwrap_or(Duration::ZERO);

                if age <= stale_after {
                    return Err(Error::Lock(format!(
                        "another scheduler instance holds {} (age {}s)",
                        path.display(),
                        age.as_secs()
                    )));
                }

                tracing::warn!(path = %path.display(), age_secs = age.as_secs(), "scheduler: reclaiming stale lock");
                drop(file);
                fs::remove_file(path).ok();
                let file = open(path)?;
                file.try_lock_exclusive()
                    .map_err(|_| Error::Lock(format!("scheduler lock {} still held after reclaim", path.display())))?;
                write_identity(&file)?;
                Ok(Self { file, path: path.to_path_buf() })
            }
        }
    }

    pub fn release(self) {
        let _ = self.file.unlock();
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "scheduler: failed to remove lock file");
        }
    }
}

fn open(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(Error::from)
}

fn write_identity(file: &File) -> Result<()> {
    let mut f = file;
    f.set_len(0)?;
    use std::io::Seek;
    f.seek(std::io::SeekFrom::Start(0))?;
    writeln!(f, "{}", std::process::id())?;
    f.flush()?;
    Ok(())
}
