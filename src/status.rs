//! Host-facing status taxonomy.
//!
//! Every public resolver operation collapses its failure modes into the
//! four-way NSS convention before anything reaches the host:
//! - NotFound:    no such record, or the upstream is unreachable/absent;
//! - TryAgain:    the caller's buffer/array was too small — retry with more
//!   space (never retried internally);
//! - Unavailable: the backing resource cannot be opened at all;
//! - Error:       unexpected I/O failure unrelated to absence or sizing.
//!
//! The errno-style cause travels in a separate slot (`Errno`), matching the
//! host's split between status enum and errno out-parameter.

/// NSS status code returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NssStatus {
    Success,
    NotFound,
    TryAgain,
    Unavailable,
    Error,
}

/// POSIX-style error cause reported alongside the status.
/// Numeric errno values appear only at the FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Errno {
    /// No cause (success paths).
    #[default]
    None,
    /// ENOENT — record absent.
    NoEnt,
    /// ERANGE — caller-supplied buffer or array capacity exhausted.
    Range,
    /// EAGAIN — transient allocation failure; retry.
    Again,
    /// EINVAL — malformed record or payload.
    Inval,
    /// ENOMEM — out of memory.
    NoMem,
    /// EIO — unexpected I/O failure.
    Io,
}

/// Outcome of a single resolver operation: payload on success, taxonomy
/// variant plus cause otherwise.
#[derive(Debug)]
pub enum NssResult<T> {
    Found(T),
    NotFound,
    TryAgain(Errno),
    Unavailable,
    Error(Errno),
}

impl<T> NssResult<T> {
    pub fn status(&self) -> NssStatus {
        match self {
            NssResult::Found(_) => NssStatus::Success,
            NssResult::NotFound => NssStatus::NotFound,
            NssResult::TryAgain(_) => NssStatus::TryAgain,
            NssResult::Unavailable => NssStatus::Unavailable,
            NssResult::Error(_) => NssStatus::Error,
        }
    }

    pub fn errno(&self) -> Errno {
        match self {
            NssResult::Found(_) => Errno::None,
            NssResult::NotFound => Errno::NoEnt,
            NssResult::TryAgain(e) => *e,
            NssResult::Unavailable => Errno::NoEnt,
            NssResult::Error(e) => *e,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, NssResult::Found(_))
    }

    /// Re-tag a failure with a different payload type (success is not mapped).
    pub fn cast_err<U>(self) -> NssResult<U> {
        match self {
            NssResult::Found(_) => NssResult::Error(Errno::Io),
            NssResult::NotFound => NssResult::NotFound,
            NssResult::TryAgain(e) => NssResult::TryAgain(e),
            NssResult::Unavailable => NssResult::Unavailable,
            NssResult::Error(e) => NssResult::Error(e),
        }
    }
}
