//! Resolver over the sorted local snapshot file.
//!
//! One pre-sorted text file (`name:x:uid:gid:gecos:home:shell`, ascending
//! uid), one open handle, one process-wide lock. The host's calling
//! convention carries no session object, so the cursor is implicit:
//! - `setent` opens the file (no-op success if already open — no duplicate
//!   handles);
//! - `getent` advances by one record, opening on demand, and keeps its
//!   position across calls, including a too-small-buffer retry;
//! - `find_uid`/`find_name` rewind to the start, probe records one by one
//!   and always close the cursor before returning, whatever the outcome;
//! - `endent` closes and is safe to call any number of times.
//!
//! The file is sorted by uid, so the uid probe classifies each record as
//! exact/low/high and a `High` record ends the scan early. Name lookups
//! cannot rely on that order and scan to EOF.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use log::debug;

use crate::buffer::{marshal_passwd, passwd_required, MarshalError, PasswdEntry};
use crate::config::Config;
use crate::metrics::record_snapshot_scan;
use crate::model::{parse_snapshot_line, Passwd};
use crate::status::{Errno, NssResult, NssStatus};

/// Outcome of probing one record against the search key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMatch {
    Exact,
    /// Record sorts below the key — keep scanning.
    Low,
    /// Record sorts above the key — on a sorted key, the search is over.
    High,
}

type Cursor = Option<BufReader<File>>;

pub struct SnapshotResolver {
    path: PathBuf,
    state: Mutex<Cursor>,
}

impl SnapshotResolver {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.snapshot_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the backing file. No-op success when already open.
    pub fn setent(&self) -> NssStatus {
        let mut state = self.lock();
        self.open_locked(&mut state)
    }

    /// Close the backing file. Idempotent; safe without a matching `setent`.
    pub fn endent(&self) -> NssStatus {
        let mut state = self.lock();
        self.close_locked(&mut state);
        NssStatus::Success
    }

    /// Advance the cursor by one record, marshaling it into `buf`.
    /// Opens the cursor on demand. A too-small buffer reports `TryAgain`
    /// and rewinds to the same record so the retry re-reads it.
    pub fn getent<'b>(&self, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        let mut state = self.lock();
        if state.is_none() {
            debug!("snapshot cursor closed, opening on demand");
            if self.open_locked(&mut state) != NssStatus::Success {
                return NssResult::Unavailable;
            }
        }
        let (rec, line_start) = match advance_parse(state.as_mut()) {
            NssResult::Found(v) => v,
            other => return other.cast_err(),
        };
        match marshal_passwd(&rec, buf) {
            Ok(entry) => NssResult::Found(entry),
            Err(MarshalError::Overflow) => {
                // Rewind so the caller's retry observes the same record.
                if let Some(reader) = state.as_mut() {
                    if reader.seek(SeekFrom::Start(line_start)).is_err() {
                        return NssResult::Error(Errno::Io);
                    }
                }
                NssResult::TryAgain(Errno::Range)
            }
            Err(MarshalError::Encoding) => NssResult::Error(Errno::Inval),
        }
    }

    /// Keyed lookup by uid; early exit on the first higher-sorted record.
    pub fn find_uid<'b>(&self, uid: u32, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        self.find_with(buf, |rec| {
            if rec.uid == uid {
                ScanMatch::Exact
            } else if rec.uid > uid {
                ScanMatch::High
            } else {
                ScanMatch::Low
            }
        })
    }

    /// Keyed lookup by name; the file is uid-sorted, so this scans to EOF.
    pub fn find_name<'b>(&self, name: &str, buf: &'b mut [u8]) -> NssResult<PasswdEntry<'b>> {
        self.find_with(buf, |rec| {
            if rec.name == name {
                ScanMatch::Exact
            } else {
                ScanMatch::Low
            }
        })
    }

    // -------- internals (called with the lock held) --------

    fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.state.lock().unwrap()
    }

    fn open_locked(&self, state: &mut Cursor) -> NssStatus {
        if state.is_some() {
            return NssStatus::Success;
        }
        match File::open(&self.path) {
            Ok(f) => {
                debug!("opened snapshot {}", self.path.display());
                *state = Some(BufReader::new(f));
                NssStatus::Success
            }
            Err(e) => {
                debug!("open snapshot {}: {}", self.path.display(), e);
                NssStatus::Unavailable
            }
        }
    }

    fn close_locked(&self, state: &mut Cursor) {
        if state.take().is_some() {
            debug!("closed snapshot {}", self.path.display());
        }
    }

    /// Rewind to the beginning of the source, opening it if needed.
    fn rewind_locked(&self, state: &mut Cursor) -> NssStatus {
        match state.as_mut() {
            Some(reader) => match reader.seek(SeekFrom::Start(0)) {
                Ok(_) => NssStatus::Success,
                Err(_) => NssStatus::Error,
            },
            None => self.open_locked(state),
        }
    }

    fn find_with<'b>(
        &self,
        buf: &'b mut [u8],
        probe: impl Fn(&Passwd) -> ScanMatch,
    ) -> NssResult<PasswdEntry<'b>> {
        let mut state = self.lock();
        match self.rewind_locked(&mut state) {
            NssStatus::Success => {}
            NssStatus::Error => return NssResult::Error(Errno::Io),
            _ => return NssResult::Unavailable,
        }
        record_snapshot_scan();

        let found = loop {
            let (rec, _) = match advance_parse(state.as_mut()) {
                NssResult::Found(v) => v,
                other => {
                    self.close_locked(&mut state);
                    return other.cast_err();
                }
            };
            // Any probed record must fit the caller's buffer, matching the
            // per-probe marshal of the underlying calling convention.
            if passwd_required(&rec) > buf.len() {
                self.close_locked(&mut state);
                return NssResult::TryAgain(Errno::Range);
            }
            match probe(&rec) {
                ScanMatch::Exact => break rec,
                ScanMatch::High => {
                    self.close_locked(&mut state);
                    return NssResult::NotFound;
                }
                ScanMatch::Low => {}
            }
        };

        // Keyed lookups never leave a cursor behind.
        self.close_locked(&mut state);
        drop(state);

        match marshal_passwd(&found, buf) {
            Ok(entry) => NssResult::Found(entry),
            Err(MarshalError::Overflow) => NssResult::TryAgain(Errno::Range),
            Err(MarshalError::Encoding) => NssResult::Error(Errno::Inval),
        }
    }
}

/// Read and parse the next record line. Returns the record together with the
/// stream offset of its line start (for overflow rewind).
fn advance_parse(reader: Option<&mut BufReader<File>>) -> NssResult<(Passwd, u64)> {
    let reader = match reader {
        Some(r) => r,
        None => return NssResult::Unavailable,
    };
    let mut line = String::new();
    loop {
        let line_start = match reader.stream_position() {
            Ok(p) => p,
            Err(_) => return NssResult::Error(Errno::Io),
        };
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return NssResult::NotFound, // end of source
            Ok(_) => {}
            Err(_) => return NssResult::Error(Errno::Io),
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }
        return match parse_snapshot_line(trimmed) {
            Ok(rec) => NssResult::Found((rec, line_start)),
            Err(e) => {
                log::warn!("malformed snapshot line: {:#}", e);
                NssResult::Error(Errno::Inval)
            }
        };
    }
}

// -------- Process-wide resolver (the host passes no handle) --------

static PASSWD_SNAPSHOT: OnceLock<SnapshotResolver> = OnceLock::new();

/// The process-wide snapshot resolver, configured from env on first use.
pub fn passwd_snapshot() -> &'static SnapshotResolver {
    PASSWD_SNAPSHOT.get_or_init(|| SnapshotResolver::from_config(&Config::from_env()))
}
