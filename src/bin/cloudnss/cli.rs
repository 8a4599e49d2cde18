use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Админ-CLI для CloudNSS: обновление snapshot-файла и отладка каталога
#[derive(Parser, Debug)]
#[command(name = "cloudnss", version, about = "CloudNSS admin CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Rebuild the local sorted snapshot from the remote directory
    Refresh {
        /// Directory endpoint (overrides CNSS_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        /// Snapshot path (overrides CNSS_SNAPSHOT_PATH)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Records per page fetch (overrides CNSS_PAGE_RECORDS)
        #[arg(long)]
        page_records: Option<usize>,
    },
    /// Look up one user in the remote directory
    Lookup {
        /// Directory endpoint (overrides CNSS_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        /// Numeric uid. Exactly one of --uid/--name.
        #[arg(long)]
        uid: Option<u32>,
        /// User name. Exactly one of --uid/--name.
        #[arg(long)]
        name: Option<String>,
        /// Output buffer size in bytes (TryAgain means: raise this)
        #[arg(long, default_value_t = 1024)]
        bufsize: usize,
    },
    /// List the gids of the groups a user belongs to
    Groups {
        /// Directory endpoint (overrides CNSS_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        user: String,
        /// External ceiling for the gid array (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },
}
