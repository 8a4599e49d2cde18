use std::path::PathBuf;

use CloudNSS::config::{Config, ConfigBuilder};
use CloudNSS::consts::{CACHE_SIZE, DEFAULT_ENDPOINT, DEFAULT_SNAPSHOT_PATH, DEFAULT_TIMEOUT_MS};

#[test]
fn defaults_match_documented_constants() {
    let cfg = Config::default();
    assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(cfg.snapshot_path, PathBuf::from(DEFAULT_SNAPSHOT_PATH));
    assert_eq!(cfg.cache_records, CACHE_SIZE);
    assert_eq!(cfg.page_records, CACHE_SIZE);
    assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
}

#[test]
fn fluent_setters_override_fields() {
    let cfg = Config::default()
        .with_endpoint("http://10.0.0.1:8080/dir/")
        .with_snapshot_path("/tmp/x.cache")
        .with_cache_records(128)
        .with_page_records(32)
        .with_timeout_ms(250);

    assert_eq!(cfg.endpoint, "http://10.0.0.1:8080/dir/");
    assert_eq!(cfg.snapshot_path, PathBuf::from("/tmp/x.cache"));
    assert_eq!(cfg.cache_records, 128);
    assert_eq!(cfg.page_records, 32);
    assert_eq!(cfg.timeout_ms, 250);
}

#[test]
fn page_records_is_clamped_to_cache_capacity() {
    let cfg = Config::default()
        .with_cache_records(64)
        .with_page_records(1000);
    assert_eq!(cfg.page_records, 64, "page cannot exceed the whole cache");

    // Ужатие ёмкости подрезает и страницу.
    let cfg = Config::default().with_page_records(512).with_cache_records(16);
    assert!(cfg.page_records <= cfg.cache_records);
}

#[test]
fn builder_from_default_produces_overridable_config() {
    let cfg = ConfigBuilder::from_default()
        .endpoint("http://127.0.0.1:1/")
        .snapshot_path("/var/tmp/p.cache")
        .cache_records(256)
        .page_records(64)
        .timeout_ms(100)
        .build();

    assert_eq!(cfg.endpoint, "http://127.0.0.1:1/");
    assert_eq!(cfg.cache_records, 256);
    assert_eq!(cfg.page_records, 64);
    assert_eq!(cfg.timeout_ms, 100);
}

#[test]
fn display_mentions_every_tunable() {
    let text = format!("{}", Config::default());
    for key in [
        "endpoint",
        "snapshot_path",
        "cache_records",
        "page_records",
        "timeout_ms",
    ] {
        assert!(text.contains(key), "Display must mention {key}: {text}");
    }
}
