//! Bounded process-wide cache of remotely fetched passwd records.
//!
//! Records arrive in equal-size pages (one page = one network call) keyed by
//! a monotonically increasing page index. Invariants:
//! - a resident page is never mutated — pages are appended, and the only
//!   eviction is a full-cache reset;
//! - one lock covers reads and mutations, and a page load holds it for the
//!   whole fetch, so a missing page is fetched at most once even under
//!   concurrent callers (they queue behind the load instead of duplicating
//!   it);
//! - the cache never decides to fetch — callers ask for a page explicitly
//!   and supply the loader, keeping fetch policy out of the data structure.

use std::sync::Mutex;

use anyhow::Result;
use log::debug;

use crate::metrics::{record_cache_hit, record_cache_miss, record_cache_reset, record_page_loaded};
use crate::model::Passwd;

/// One fetched batch of records.
#[derive(Debug, Clone)]
pub struct CachePage {
    pub index: u64,
    pub records: Vec<Passwd>,
}

/// Result of `ensure_page_loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFill {
    /// Page is resident with this many records.
    Loaded(usize),
    /// The directory ended before this page; nothing to load.
    End,
}

#[derive(Default)]
struct CacheInner {
    pages: Vec<CachePage>,
    records: usize,
    /// Index of the final (short) page once the directory end was observed.
    end_index: Option<u64>,
}

impl CacheInner {
    fn page(&self, index: u64) -> Option<&CachePage> {
        self.pages.iter().find(|p| p.index == index)
    }

    fn reset(&mut self) {
        if !self.pages.is_empty() || self.end_index.is_some() {
            debug!("cache reset: dropping {} page(s)", self.pages.len());
            self.pages.clear();
            self.records = 0;
            self.end_index = None;
            record_cache_reset();
        }
    }
}

pub struct NssCache {
    max_records: usize,
    page_records: usize,
    inner: Mutex<CacheInner>,
}

impl NssCache {
    pub fn new(max_records: usize, page_records: usize) -> Self {
        let max_records = max_records.max(1);
        Self {
            max_records,
            page_records: page_records.clamp(1, max_records),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Records requested per page load.
    pub fn page_records(&self) -> usize {
        self.page_records
    }

    pub fn lookup_uid(&self, uid: u32) -> Option<Passwd> {
        self.lookup(|rec| rec.uid == uid)
    }

    pub fn lookup_name(&self, name: &str) -> Option<Passwd> {
        self.lookup(|rec| rec.name == name)
    }

    fn lookup(&self, pred: impl Fn(&Passwd) -> bool) -> Option<Passwd> {
        let inner = self.inner.lock().unwrap();
        for page in &inner.pages {
            if let Some(rec) = page.records.iter().find(|r| pred(r)) {
                record_cache_hit();
                return Some(rec.clone());
            }
        }
        record_cache_miss();
        None
    }

    /// Make `index` resident, invoking `loader` under the cache lock if the
    /// page is missing. Loading a page past capacity (or out of sequence)
    /// discards the whole cache first — the only eviction there is.
    pub fn ensure_page_loaded(
        &self,
        index: u64,
        loader: impl FnOnce(u64, usize) -> Result<Vec<Passwd>>,
    ) -> Result<PageFill> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(page) = inner.page(index) {
            if page.records.is_empty() {
                return Ok(PageFill::End);
            }
            return Ok(PageFill::Loaded(page.records.len()));
        }
        if let Some(end) = inner.end_index {
            if index > end {
                return Ok(PageFill::End);
            }
        }

        // Append-only: a gap or a full store means starting over.
        if let Some(last) = inner.pages.last() {
            let out_of_sequence = index != last.index + 1;
            let over_capacity = inner.records + self.page_records > self.max_records;
            if out_of_sequence || over_capacity {
                inner.reset();
            }
        }

        let records = loader(index, self.page_records)?;
        record_page_loaded();
        let len = records.len();
        if len < self.page_records {
            inner.end_index = Some(index);
        }
        debug!("loaded page {} ({} records)", index, len);
        inner.records += len;
        inner.pages.push(CachePage { index, records });
        if len == 0 {
            return Ok(PageFill::End);
        }
        Ok(PageFill::Loaded(len))
    }

    /// Record at (page, offset), if resident.
    pub fn record_at(&self, index: u64, offset: usize) -> Option<Passwd> {
        let inner = self.inner.lock().unwrap();
        inner.page(index).and_then(|p| p.records.get(offset).cloned())
    }

    /// Discard all pages. Required under external invalidation.
    pub fn reset(&self) {
        self.inner.lock().unwrap().reset();
    }

    pub fn resident_pages(&self) -> usize {
        self.inner.lock().unwrap().pages.len()
    }

    pub fn resident_records(&self) -> usize {
        self.inner.lock().unwrap().records
    }
}
