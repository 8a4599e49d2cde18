//! Общие константы (кэш, snapshot-файл, удалённый каталог, ENV-имена).

// -------- Remote cache --------
// Размер кэша в записях. Он же — сколько записей запрашивается
// за один сетевой вызов (одна страница = один fetch).
pub const CACHE_SIZE: usize = 2048;

// -------- Snapshot file --------
pub const DEFAULT_SNAPSHOT_PATH: &str = "/etc/cloudnss/passwd.cache";
// Суффиксы рядом с snapshot-файлом: tmp для атомарной записи, lock для fs2.
pub const SNAPSHOT_TMP_SUFFIX: &str = ".tmp";
pub const SNAPSHOT_LOCK_SUFFIX: &str = ".lock";

// Формат строки: name:passwd:uid:gid:gecos:home:shell (отсортировано по uid).
pub const SNAPSHOT_FIELDS: usize = 7;

// -------- Remote directory --------
pub const DEFAULT_ENDPOINT: &str = "http://169.254.169.254/identity/v1/";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

// Дефолты для неполных профилей из каталога
pub const DEFAULT_SHELL: &str = "/bin/bash";
pub const HOME_PREFIX: &str = "/home/";

// -------- ENV --------
pub const ENV_ENDPOINT: &str = "CNSS_ENDPOINT";
pub const ENV_SNAPSHOT_PATH: &str = "CNSS_SNAPSHOT_PATH";
pub const ENV_CACHE_RECORDS: &str = "CNSS_CACHE_RECORDS";
pub const ENV_PAGE_RECORDS: &str = "CNSS_PAGE_RECORDS";
pub const ENV_TIMEOUT_MS: &str = "CNSS_TIMEOUT_MS";
