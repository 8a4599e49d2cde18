//! Group-membership expansion into a caller-owned growable gid array.
//!
//! The host hands over an array it owns, a cursor, and an optional external
//! capacity ceiling. Growth is amortized doubling, clamped to the ceiling;
//! hitting the ceiling and failing to allocate are distinct causes (ERANGE
//! vs EAGAIN), both surfaced as `TryAgain` — the decision to retry with a
//! bigger ceiling or accept truncation belongs to the caller. The reported
//! length is always consistent with the populated prefix.

use crate::model::GroupRef;
use crate::remote::fetch::Fetch;
use crate::remote::RemoteResolver;
use crate::status::{Errno, NssResult};

/// Next capacity after doubling `cur` under an external ceiling.
/// `limit <= 0` means unbounded. `Err(Range)` when already at the ceiling.
pub fn grown_capacity(cur: usize, limit: i64) -> Result<usize, Errno> {
    let doubled = cur.saturating_mul(2).max(1);
    if limit > 0 {
        let limit = limit as usize;
        if cur >= limit {
            return Err(Errno::Range);
        }
        return Ok(doubled.min(limit));
    }
    Ok(doubled)
}

/// Caller-owned gid array with explicit capacity bookkeeping: the allocated
/// capacity is tracked separately from the underlying storage so the growth
/// policy (and its failure causes) stays observable.
#[derive(Debug)]
pub struct GidBuf {
    data: Vec<u32>,
    cap: usize,
}

impl GidBuf {
    pub fn with_capacity(n: usize) -> Self {
        let n = n.max(1);
        Self {
            data: Vec::with_capacity(n),
            cap: n,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Append one gid, doubling capacity under `limit` when full.
    pub fn push_within(&mut self, gid: u32, limit: i64) -> Result<(), Errno> {
        if self.data.len() == self.cap {
            let new_cap = grown_capacity(self.cap, limit)?;
            self.data
                .try_reserve_exact(new_cap - self.data.len())
                .map_err(|_| Errno::Again)?;
            self.cap = new_cap;
        }
        self.data.push(gid);
        Ok(())
    }
}

/// Resolve the groups `user` belongs to and append their gids to `out`.
///
/// `_skip_gid` (typically the user's primary group) is accepted for symmetry
/// with the host contract; filtering it out is the caller's responsibility —
/// every membership the directory reports is appended, in directory order.
/// Returns the number of gids appended.
pub fn expand_groups<F: Fetch>(
    resolver: &RemoteResolver<F>,
    user: &str,
    _skip_gid: Option<u32>,
    out: &mut GidBuf,
    limit: i64,
) -> NssResult<usize> {
    let groups: Vec<GroupRef> = match resolver.groups_for_user(user) {
        NssResult::Found(groups) => groups,
        other => return other.cast_err(),
    };
    let mut appended = 0usize;
    for group in &groups {
        match out.push_within(group.gid, limit) {
            Ok(()) => appended += 1,
            Err(e) => return NssResult::TryAgain(e),
        }
    }
    NssResult::Found(appended)
}
