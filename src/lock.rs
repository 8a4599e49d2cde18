//! File-based locking for the snapshot refresher.
//!
//! Cross-platform (fs2) advisory lock, exclusive mode only: a single
//! refresher may rewrite the snapshot file at a time; resolvers never take
//! this lock (they read the published file).
//!
//! Lock file path: `<snapshot>.lock`
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::consts::SNAPSHOT_LOCK_SUFFIX;

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

fn lock_file_path(snapshot: &Path) -> PathBuf {
    let mut os = snapshot.as_os_str().to_os_string();
    os.push(SNAPSHOT_LOCK_SUFFIX);
    PathBuf::from(os)
}

fn open_lock_file(snapshot: &Path) -> Result<(std::fs::File, PathBuf)> {
    let path = lock_file_path(snapshot);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    Ok((f, path))
}

/// Acquire the refresher lock. Blocks until acquired.
pub fn acquire_refresh_lock(snapshot: &Path) -> Result<LockGuard> {
    let (file, path) = open_lock_file(snapshot)?;
    file.lock_exclusive()
        .with_context(|| format!("lock_exclusive {}", path.display()))?;
    Ok(LockGuard { file, path })
}

/// Try to acquire the refresher lock. Returns Err if already locked.
pub fn try_acquire_refresh_lock(snapshot: &Path) -> Result<LockGuard> {
    let (file, path) = open_lock_file(snapshot)?;
    file.try_lock_exclusive()
        .with_context(|| format!("try_lock_exclusive failed: {}", path.display()))?;
    Ok(LockGuard { file, path })
}
