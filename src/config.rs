//! Centralized configuration and builder for CloudNSS.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - Config::from_env() reads the documented CNSS_* env vars; every field can
//!   also be overridden through fluent setters or the builder.
//!
//! The host's calling convention carries no configuration, so the global
//! resolver singletons are constructed from this once per process.

use std::fmt;
use std::path::PathBuf;

use crate::consts::{
    CACHE_SIZE, DEFAULT_ENDPOINT, DEFAULT_SNAPSHOT_PATH, DEFAULT_TIMEOUT_MS, ENV_CACHE_RECORDS,
    ENV_ENDPOINT, ENV_PAGE_RECORDS, ENV_SNAPSHOT_PATH, ENV_TIMEOUT_MS,
};

/// Top-level configuration for both resolution engines.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the remote identity directory.
    /// Env: CNSS_ENDPOINT (default http://169.254.169.254/identity/v1/)
    pub endpoint: String,

    /// Path of the sorted local snapshot file.
    /// Env: CNSS_SNAPSHOT_PATH (default /etc/cloudnss/passwd.cache)
    pub snapshot_path: PathBuf,

    /// Record cache capacity (records, whole pages).
    /// Env: CNSS_CACHE_RECORDS (default 2048)
    pub cache_records: usize,

    /// Records per fetched page; also the per-fetch request size.
    /// Env: CNSS_PAGE_RECORDS (default = cache_records)
    pub page_records: usize,

    /// Socket timeout for remote fetches, milliseconds.
    /// Env: CNSS_TIMEOUT_MS (default 5000)
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            cache_records: CACHE_SIZE,
            page_records: CACHE_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var(ENV_ENDPOINT) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.endpoint = s.to_string();
            }
        }

        if let Ok(v) = std::env::var(ENV_SNAPSHOT_PATH) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.snapshot_path = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var(ENV_CACHE_RECORDS) {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.cache_records = n;
                    // page size follows capacity unless set explicitly below
                    cfg.page_records = n;
                }
            }
        }

        if let Ok(v) = std::env::var(ENV_PAGE_RECORDS) {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.page_records = n.min(cfg.cache_records);
                }
            }
        }

        if let Ok(v) = std::env::var(ENV_TIMEOUT_MS) {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.timeout_ms = n;
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_cache_records(mut self, n: usize) -> Self {
        self.cache_records = n.max(1);
        self.page_records = self.page_records.min(self.cache_records);
        self
    }

    pub fn with_page_records(mut self, n: usize) -> Self {
        self.page_records = n.max(1).min(self.cache_records);
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ endpoint: {}, snapshot_path: {}, cache_records: {}, \
             page_records: {}, timeout_ms: {} }}",
            self.endpoint,
            self.snapshot_path.display(),
            self.cache_records,
            self.page_records,
            self.timeout_ms,
        )
    }
}

/// Lightweight builder that produces a Config.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    cfg: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        // Start from env to preserve process-level behavior, then override.
        Self { cfg: Config::from_env() }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self { cfg: Config::default() }
    }

    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.cfg.endpoint = endpoint.into();
        self
    }

    pub fn snapshot_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cfg.snapshot_path = path.into();
        self
    }

    pub fn cache_records(mut self, n: usize) -> Self {
        self.cfg = self.cfg.with_cache_records(n);
        self
    }

    pub fn page_records(mut self, n: usize) -> Self {
        self.cfg = self.cfg.with_page_records(n);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.cfg.timeout_ms = ms;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Config {
        self.cfg
    }
}
