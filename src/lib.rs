#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod status;
pub mod model;
pub mod metrics;
pub mod lock;

// Marshaling в буфер вызывающей стороны
pub mod buffer;

// Резолверы: локальный snapshot-файл и удалённый каталог
pub mod snapshot; // src/snapshot/mod.rs
pub mod remote;   // src/remote/{mod,cache,fetch}.rs

// Расширение членства в группах (initgroups)
pub mod expand;

// Обновление snapshot-файла из удалённого каталога
pub mod refresh;

// NEW: FFI (C ABI) — включается фичей "ffi"
#[cfg(feature = "ffi")]
pub mod ffi;

// Удобные реэкспорты
pub use config::Config;
pub use status::{Errno, NssResult, NssStatus};
pub use model::{Group, GroupRef, LookupKey, Passwd};
pub use buffer::{GroupEntry, MarshalError, PasswdEntry, RecordArena};
pub use snapshot::{passwd_snapshot, SnapshotResolver};
pub use remote::{remote_resolver, RemoteResolver};
pub use remote::cache::NssCache;
pub use remote::fetch::{Fetch, FetchResponse, HttpFetcher};
pub use expand::{expand_groups, GidBuf};
pub use refresh::{refresh_snapshot, RefreshStats};
