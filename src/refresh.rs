//! Snapshot refresh: page through the remote directory and atomically
//! rewrite the local sorted snapshot file.
//!
//! Writers are serialized with the fs2 advisory lock; readers never take it —
//! they only ever see either the old or the new file thanks to tmp+rename.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::consts::SNAPSHOT_TMP_SUFFIX;
use crate::lock::acquire_refresh_lock;
use crate::metrics::record_snapshot_refresh;
use crate::model::format_snapshot_line;
use crate::remote::fetch::Fetch;
use crate::remote::RemoteResolver;

#[derive(Debug, Clone, Copy)]
pub struct RefreshStats {
    pub users: usize,
    pub bytes: u64,
}

fn path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Fetch every user record, sort by uid (the snapshot's search key) and
/// replace the snapshot file in one rename.
pub fn refresh_snapshot<F: Fetch>(
    resolver: &RemoteResolver<F>,
    path: &Path,
) -> Result<RefreshStats> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = fs::create_dir_all(parent);
        }
    }
    let _lock = acquire_refresh_lock(path)?;

    let mut users = resolver.list_users().context("list directory users")?;
    users.sort_by_key(|u| u.uid);

    let tmp = path_with_suffix(path, SNAPSHOT_TMP_SUFFIX);
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .with_context(|| format!("open snapshot tmp {}", tmp.display()))?;
    let mut w = BufWriter::new(file);

    let mut bytes = 0u64;
    for user in &users {
        let line = format_snapshot_line(user);
        w.write_all(line.as_bytes())
            .and_then(|_| w.write_all(b"\n"))
            .with_context(|| format!("write snapshot tmp {}", tmp.display()))?;
        bytes += line.len() as u64 + 1;
    }

    let file = w
        .into_inner()
        .map_err(|e| anyhow!("flush snapshot tmp {}: {}", tmp.display(), e))?;
    file.sync_all()
        .with_context(|| format!("sync snapshot tmp {}", tmp.display()))?;
    drop(file);

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;

    record_snapshot_refresh();
    info!("snapshot refreshed: {} users, {} bytes", users.len(), bytes);
    Ok(RefreshStats {
        users: users.len(),
        bytes,
    })
}
