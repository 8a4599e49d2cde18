//! Resolver against the remote identity directory.
//!
//! Query flow: consult the record cache, fall back to one scoped GET, decode
//! the JSON payload, marshal into the caller's buffer. The host contract
//! only distinguishes "found" from "not found/unavailable", so transport
//! failures, non-200 statuses and empty bodies all collapse into `NotFound`
//! (the distinction survives in logs and metrics, not in the return code).
//!
//! Name keys are percent-encoded into the query string; uids travel verbatim.
//! Group resolution is two sub-queries — base attributes, then the member
//! username list — and both must succeed.

pub mod cache;
pub mod fetch;

use std::sync::{Mutex, OnceLock};

use anyhow::{anyhow, Result};
use log::{debug, error, warn};
use urlencoding::encode;

use crate::buffer::{marshal_group, marshal_passwd, GroupEntry, MarshalError, PasswdEntry};
use crate::config::Config;
use crate::metrics::{record_malformed_payload, record_remote_fetch, record_remote_fetch_error};
use crate::model::{
    decode_group_ref, decode_group_refs, decode_passwd, decode_users_page, decode_usernames,
    Group, GroupRef, LookupKey, Passwd,
};
use crate::status::{Errno, NssResult, NssStatus};

use cache::{NssCache, PageFill};
use fetch::{Fetch, HttpFetcher};

/// Implicit enumeration state: the host's calling convention passes no
/// session handle across begin/next/end.
#[derive(Debug, Default)]
struct EnumCursor {
    open: bool,
    page: u64,
    offset: usize,
}

pub struct RemoteResolver<F: Fetch = HttpFetcher> {
    endpoint: String,
    fetch: F,
    cache: NssCache,
    cursor: Mutex<EnumCursor>,
}

impl RemoteResolver<HttpFetcher> {
    pub fn from_config(cfg: &Config) -> Self {
        Self::with_fetcher(
            &cfg.endpoint,
            HttpFetcher::new(cfg.timeout_ms),
            cfg.cache_records,
            cfg.page_records,
        )
    }
}

impl<F: Fetch> RemoteResolver<F> {
    pub fn with_fetcher(
        endpoint: &str,
        fetch: F,
        cache_records: usize,
        page_records: usize,
    ) -> Self {
        let endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        Self {
            endpoint,
            fetch,
            cache: NssCache::new(cache_records, page_records),
            cursor: Mutex::new(EnumCursor::default()),
        }
    }

    pub fn cache(&self) -> &NssCache {
        &self.cache
    }

    // -------- passwd lookups --------

    pub fn get_uid<'b>(&self, uid: u32, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        self.get_user(LookupKey::Id(uid), buf)
    }

    pub fn get_name<'b>(&self, name: &str, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        self.get_user(LookupKey::Name(name), buf)
    }

    fn get_user<'b>(&self, key: LookupKey<'_>, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        let cached = match key {
            LookupKey::Id(uid) => self.cache.lookup_uid(uid),
            LookupKey::Name(name) => self.cache.lookup_name(name),
        };
        let rec = match cached {
            Some(rec) => rec,
            None => {
                let body = match self.fetch_body(&self.user_url(key)) {
                    Some(body) => body,
                    None => return NssResult::NotFound,
                };
                match decode_passwd(&body) {
                    Ok(rec) => rec,
                    Err(e) => return self.malformed(&e),
                }
            }
        };
        marshal_pw(&rec, buf)
    }

    // -------- group lookups --------

    pub fn get_group_gid<'b>(&self, gid: u32, buf: &'b mut [u8]) -> NssResult<GroupEntry<'b>> {
        self.get_group(LookupKey::Id(gid), buf)
    }

    pub fn get_group_name<'b>(&self, name: &str, buf: &'b mut [u8]) -> NssResult<GroupEntry<'b>> {
        self.get_group(LookupKey::Name(name), buf)
    }

    fn get_group<'b>(&self, key: LookupKey<'_>, buf: &'b mut [u8]) -> NssResult<GroupEntry<'b>> {
        let body = match self.fetch_body(&self.group_url(key)) {
            Some(body) => body,
            None => return NssResult::NotFound,
        };
        let base = match decode_group_ref(&body) {
            Ok(base) => base,
            Err(e) => return self.malformed(&e),
        };

        // Second sub-query: the ordered member list.
        let url = format!(
            "{}users?groupname={}",
            self.endpoint,
            encode(&base.name)
        );
        let body = match self.fetch_body(&url) {
            Some(body) => body,
            None => return NssResult::NotFound,
        };
        let members = match decode_usernames(&body) {
            Ok(members) => members,
            Err(e) => return self.malformed(&e),
        };

        let group = Group {
            name: base.name,
            gid: base.gid,
            members,
        };
        match marshal_group(&group, buf) {
            Ok(entry) => NssResult::Found(entry),
            Err(MarshalError::Overflow) => NssResult::TryAgain(Errno::Range),
            Err(MarshalError::Encoding) => NssResult::Error(Errno::Inval),
        }
    }

    /// Ordered groups a user belongs to (base attributes only).
    pub fn groups_for_user(&self, user: &str) -> NssResult<Vec<GroupRef>> {
        let url = format!("{}groups?username={}", self.endpoint, encode(user));
        let body = match self.fetch_body(&url) {
            Some(body) => body,
            None => return NssResult::NotFound,
        };
        match decode_group_refs(&body) {
            Ok(groups) => NssResult::Found(groups),
            Err(e) => self.malformed(&e),
        }
    }

    // -------- enumeration over cache pages --------

    /// Start (or restart) enumeration at the first page.
    pub fn set_enum(&self) -> NssStatus {
        let mut cur = self.cursor.lock().unwrap();
        *cur = EnumCursor {
            open: true,
            page: 0,
            offset: 0,
        };
        NssStatus::Success
    }

    /// Next record in directory order, loading pages as the cursor crosses
    /// them. Opens the cursor on demand; a too-small buffer reports
    /// `TryAgain` without advancing, so the retry sees the same record.
    pub fn next_enum<'b>(&self, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        let mut cur = self.cursor.lock().unwrap();
        if !cur.open {
            *cur = EnumCursor {
                open: true,
                page: 0,
                offset: 0,
            };
        }
        loop {
            let fill = match self
                .cache
                .ensure_page_loaded(cur.page, |idx, n| self.load_page(idx, n))
            {
                Ok(fill) => fill,
                Err(e) => {
                    warn!("page {} load failed: {:#}", cur.page, e);
                    return NssResult::NotFound;
                }
            };
            let len = match fill {
                PageFill::End => return NssResult::NotFound,
                PageFill::Loaded(len) => len,
            };
            if cur.offset >= len {
                cur.page += 1;
                cur.offset = 0;
                continue;
            }
            let rec = match self.cache.record_at(cur.page, cur.offset) {
                Some(rec) => rec,
                None => return NssResult::NotFound,
            };
            return match marshal_pw(&rec, buf) {
                NssResult::Found(entry) => {
                    cur.offset += 1;
                    NssResult::Found(entry)
                }
                other => other,
            };
        }
    }

    /// Close the enumeration cursor. Idempotent.
    pub fn end_enum(&self) -> NssStatus {
        self.cursor.lock().unwrap().open = false;
        NssStatus::Success
    }

    /// Page through the whole directory (snapshot refresher path).
    pub fn list_users(&self) -> Result<Vec<Passwd>> {
        let mut out = Vec::new();
        let mut page = 0u64;
        loop {
            let fill = self
                .cache
                .ensure_page_loaded(page, |idx, n| self.load_page(idx, n))?;
            let len = match fill {
                PageFill::End => break,
                PageFill::Loaded(len) => len,
            };
            for offset in 0..len {
                if let Some(rec) = self.cache.record_at(page, offset) {
                    out.push(rec);
                }
            }
            if len < self.cache.page_records() {
                break;
            }
            page += 1;
        }
        Ok(out)
    }

    // -------- plumbing --------

    fn user_url(&self, key: LookupKey<'_>) -> String {
        match key {
            LookupKey::Id(uid) => format!("{}users?uid={}", self.endpoint, uid),
            LookupKey::Name(name) => {
                format!("{}users?username={}", self.endpoint, encode(name))
            }
        }
    }

    fn group_url(&self, key: LookupKey<'_>) -> String {
        match key {
            LookupKey::Id(gid) => format!("{}groups?gid={}", self.endpoint, gid),
            LookupKey::Name(name) => {
                format!("{}groups?groupname={}", self.endpoint, encode(name))
            }
        }
    }

    fn page_url(&self, index: u64, page_records: usize) -> String {
        format!(
            "{}users?pagesize={}&page={}",
            self.endpoint, page_records, index
        )
    }

    fn load_page(&self, index: u64, page_records: usize) -> Result<Vec<Passwd>> {
        let url = self.page_url(index, page_records);
        let body = self
            .fetch_body(&url)
            .ok_or_else(|| anyhow!("no usable response for page {}", index))?;
        decode_users_page(&body).map_err(|e| {
            error!("received malformed response from server: {:#}", e);
            record_malformed_payload();
            e
        })
    }

    /// One GET with the absence conflation applied: transport failure,
    /// non-200 and empty body all come back as None.
    fn fetch_body(&self, url: &str) -> Option<Vec<u8>> {
        record_remote_fetch();
        let resp = match self.fetch.get(url) {
            Ok(resp) => resp,
            Err(e) => {
                record_remote_fetch_error();
                warn!("fetch {}: {:#}", url, e);
                return None;
            }
        };
        if resp.status != 200 {
            debug!("fetch {}: status {}", url, resp.status);
            return None;
        }
        if resp.body.is_empty() {
            debug!("fetch {}: empty body", url);
            return None;
        }
        Some(resp.body)
    }

    /// Malformed upstream payload: diagnostic for operators, `NotFound` for
    /// the host.
    fn malformed<T>(&self, e: &anyhow::Error) -> NssResult<T> {
        error!("received malformed response from server: {:#}", e);
        record_malformed_payload();
        NssResult::NotFound
    }
}

fn marshal_pw<'b>(rec: &Passwd, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
    match marshal_passwd(rec, buf) {
        Ok(entry) => NssResult::Found(entry),
        Err(MarshalError::Overflow) => NssResult::TryAgain(Errno::Range),
        Err(MarshalError::Encoding) => NssResult::Error(Errno::Inval),
    }
}

// -------- Process-wide resolver (the host passes no handle) --------

static REMOTE: OnceLock<RemoteResolver<HttpFetcher>> = OnceLock::new();

/// The process-wide remote resolver, configured from env on first use.
pub fn remote_resolver() -> &'static RemoteResolver<HttpFetcher> {
    REMOTE.get_or_init(|| RemoteResolver::from_config(&Config::from_env()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFetch;
    impl Fetch for NoFetch {
        fn get(&self, _url: &str) -> Result<fetch::FetchResponse> {
            Err(anyhow!("offline"))
        }
    }

    fn resolver() -> RemoteResolver<NoFetch> {
        RemoteResolver::with_fetcher("http://host/api", NoFetch, 64, 16)
    }

    #[test]
    fn urls_encode_names_and_pass_ids_verbatim() {
        let r = resolver();
        assert_eq!(
            r.user_url(LookupKey::Id(1001)),
            "http://host/api/users?uid=1001"
        );
        assert_eq!(
            r.user_url(LookupKey::Name("weird user&x=1")),
            "http://host/api/users?username=weird%20user%26x%3D1"
        );
        assert_eq!(
            r.group_url(LookupKey::Name("dev ops")),
            "http://host/api/groups?groupname=dev%20ops"
        );
        assert_eq!(r.page_url(3, 16), "http://host/api/users?pagesize=16&page=3");
    }

    #[test]
    fn transport_failure_is_not_found() {
        let r = resolver();
        let mut buf = [0u8; 256];
        let res = r.get_uid(42, &mut buf);
        assert_eq!(res.status(), NssStatus::NotFound);
        assert_eq!(res.errno(), Errno::NoEnt);
    }
}
