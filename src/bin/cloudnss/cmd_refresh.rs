use std::path::PathBuf;

use anyhow::Result;

use CloudNSS::{refresh_snapshot, Config, RemoteResolver};

pub fn exec(
    endpoint: Option<String>,
    out: Option<PathBuf>,
    page_records: Option<usize>,
) -> Result<()> {
    let mut cfg = Config::from_env();
    if let Some(e) = endpoint {
        cfg = cfg.with_endpoint(e);
    }
    if let Some(o) = out {
        cfg = cfg.with_snapshot_path(o);
    }
    if let Some(n) = page_records {
        cfg = cfg.with_page_records(n);
    }

    let resolver = RemoteResolver::from_config(&cfg);
    let stats = refresh_snapshot(&resolver, &cfg.snapshot_path)?;
    println!(
        "snapshot {}: {} users, {} bytes",
        cfg.snapshot_path.display(),
        stats.users,
        stats.bytes
    );
    Ok(())
}
