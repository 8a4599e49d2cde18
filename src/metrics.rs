//! Lightweight global metrics for CloudNSS.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Remote fetch / page loads
//! - Record cache (hits/misses/resets)
//! - Buffer marshaling (overflow retries)
//! - Snapshot file (scans, refreshes)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Remote fetch -----
static REMOTE_FETCHES_TOTAL: AtomicU64 = AtomicU64::new(0);
static REMOTE_FETCH_ERRORS: AtomicU64 = AtomicU64::new(0);
static REMOTE_PAGES_LOADED: AtomicU64 = AtomicU64::new(0);
static MALFORMED_PAYLOADS: AtomicU64 = AtomicU64::new(0);

// ----- Record cache -----
static CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static CACHE_MISSES: AtomicU64 = AtomicU64::new(0);
static CACHE_RESETS: AtomicU64 = AtomicU64::new(0);

// ----- Marshaling -----
static MARSHAL_OVERFLOWS: AtomicU64 = AtomicU64::new(0);

// ----- Snapshot file -----
static SNAPSHOT_SCANS: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_REFRESHES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub remote_fetches_total: u64,
    pub remote_fetch_errors: u64,
    pub remote_pages_loaded: u64,
    pub malformed_payloads: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_resets: u64,

    pub marshal_overflows: u64,

    pub snapshot_scans: u64,
    pub snapshot_refreshes: u64,
}

impl MetricsSnapshot {
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        remote_fetches_total: REMOTE_FETCHES_TOTAL.load(Ordering::Relaxed),
        remote_fetch_errors: REMOTE_FETCH_ERRORS.load(Ordering::Relaxed),
        remote_pages_loaded: REMOTE_PAGES_LOADED.load(Ordering::Relaxed),
        malformed_payloads: MALFORMED_PAYLOADS.load(Ordering::Relaxed),
        cache_hits: CACHE_HITS.load(Ordering::Relaxed),
        cache_misses: CACHE_MISSES.load(Ordering::Relaxed),
        cache_resets: CACHE_RESETS.load(Ordering::Relaxed),
        marshal_overflows: MARSHAL_OVERFLOWS.load(Ordering::Relaxed),
        snapshot_scans: SNAPSHOT_SCANS.load(Ordering::Relaxed),
        snapshot_refreshes: SNAPSHOT_REFRESHES.load(Ordering::Relaxed),
    }
}

/// Zero every counter (tests, long-lived diagnostics sessions).
pub fn reset() {
    REMOTE_FETCHES_TOTAL.store(0, Ordering::Relaxed);
    REMOTE_FETCH_ERRORS.store(0, Ordering::Relaxed);
    REMOTE_PAGES_LOADED.store(0, Ordering::Relaxed);
    MALFORMED_PAYLOADS.store(0, Ordering::Relaxed);
    CACHE_HITS.store(0, Ordering::Relaxed);
    CACHE_MISSES.store(0, Ordering::Relaxed);
    CACHE_RESETS.store(0, Ordering::Relaxed);
    MARSHAL_OVERFLOWS.store(0, Ordering::Relaxed);
    SNAPSHOT_SCANS.store(0, Ordering::Relaxed);
    SNAPSHOT_REFRESHES.store(0, Ordering::Relaxed);
}

// ----- Recorders (remote) -----
pub fn record_remote_fetch() {
    REMOTE_FETCHES_TOTAL.fetch_add(1, Ordering::Relaxed);
}
pub fn record_remote_fetch_error() {
    REMOTE_FETCH_ERRORS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_page_loaded() {
    REMOTE_PAGES_LOADED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_malformed_payload() {
    MALFORMED_PAYLOADS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (cache) -----
pub fn record_cache_hit() {
    CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_miss() {
    CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
}
pub fn record_cache_reset() {
    CACHE_RESETS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (marshaling) -----
pub fn record_marshal_overflow() {
    MARSHAL_OVERFLOWS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (snapshot) -----
pub fn record_snapshot_scan() {
    SNAPSHOT_SCANS.fetch_add(1, Ordering::Relaxed);
}
pub fn record_snapshot_refresh() {
    SNAPSHOT_REFRESHES.fetch_add(1, Ordering::Relaxed);
}
