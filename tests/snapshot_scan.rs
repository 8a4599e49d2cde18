use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use CloudNSS::{Errno, NssResult, NssStatus, SnapshotResolver};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("cnsstest-snap-{prefix}-{pid}-{t}-{id}"))
}

/// Write a snapshot file with entries for uids 10, 20, 30 (sorted).
fn write_sample(prefix: &str) -> Result<PathBuf> {
    let root = unique_root(prefix);
    fs::create_dir_all(&root)?;
    let path = root.join("passwd.cache");
    fs::write(
        &path,
        "ten:x:10:10:Ten:/home/ten:/bin/bash\n\
         twenty:x:20:20:Twenty:/home/twenty:/bin/bash\n\
         thirty:x:30:30:Thirty:/home/thirty:/bin/sh\n",
    )?;
    Ok(path)
}

#[test]
fn find_uid_hit_and_miss_leave_resolver_closed() -> Result<()> {
    let path = write_sample("find")?;
    let resolver = SnapshotResolver::new(&path);

    let mut buf = vec![0u8; 512];
    match resolver.find_uid(20, &mut buf) {
        NssResult::Found(entry) => {
            assert_eq!(entry.name, "twenty");
            assert_eq!(entry.uid, 20);
            assert_eq!(entry.dir, "/home/twenty");
        }
        other => panic!("expected Found, got {:?}", other.status()),
    }

    // 25 сортируется между 20 и 30 — ранний выход по отсортированному uid.
    let mut buf = vec![0u8; 512];
    let res = resolver.find_uid(25, &mut buf);
    assert_eq!(res.status(), NssStatus::NotFound);
    assert_eq!(res.errno(), Errno::NoEnt);

    // Keyed lookups must not leave a cursor behind: a fresh enumeration
    // starts from position zero.
    let mut buf = vec![0u8; 512];
    match resolver.getent(&mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.uid, 10, "iteration must start fresh"),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    Ok(())
}

#[test]
fn find_name_scans_to_the_last_record() -> Result<()> {
    let path = write_sample("byname")?;
    let resolver = SnapshotResolver::new(&path);

    let mut buf = vec![0u8; 512];
    match resolver.find_name("thirty", &mut buf) {
        NssResult::Found(entry) => {
            assert_eq!(entry.uid, 30);
            assert_eq!(entry.shell, "/bin/sh");
        }
        other => panic!("expected Found, got {:?}", other.status()),
    }

    let mut buf = vec![0u8; 512];
    assert_eq!(
        resolver.find_name("nobody", &mut buf).status(),
        NssStatus::NotFound
    );
    Ok(())
}

#[test]
fn iteration_is_ordered_and_eof_repeats_not_found() -> Result<()> {
    let path = write_sample("iter")?;
    let resolver = SnapshotResolver::new(&path);

    assert_eq!(resolver.setent(), NssStatus::Success);
    // setent на уже открытом курсоре — no-op success.
    assert_eq!(resolver.setent(), NssStatus::Success);

    let mut uids = Vec::new();
    loop {
        let mut buf = vec![0u8; 512];
        match resolver.getent(&mut buf) {
            NssResult::Found(entry) => uids.push(entry.uid),
            NssResult::NotFound => break,
            other => panic!("unexpected {:?}", other.status()),
        }
    }
    assert_eq!(uids, vec![10, 20, 30], "source order must be preserved");

    // После EOF — NotFound на каждом следующем вызове.
    let mut buf = vec![0u8; 512];
    assert_eq!(resolver.getent(&mut buf).status(), NssStatus::NotFound);
    assert_eq!(resolver.getent(&mut buf).status(), NssStatus::NotFound);

    // setent на открытом курсоре — no-op; заново начинаем через endent.
    assert_eq!(resolver.setent(), NssStatus::Success);
    assert_eq!(resolver.getent(&mut buf).status(), NssStatus::NotFound);
    assert_eq!(resolver.endent(), NssStatus::Success);
    match resolver.getent(&mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.uid, 10),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    Ok(())
}

#[test]
fn getent_auto_opens_and_endent_is_idempotent() -> Result<()> {
    let path = write_sample("autoopen")?;
    let resolver = SnapshotResolver::new(&path);

    // endent без setent — no-op success, сколько угодно раз.
    assert_eq!(resolver.endent(), NssStatus::Success);
    assert_eq!(resolver.endent(), NssStatus::Success);

    // getent без setent открывает курсор сам.
    let mut buf = vec![0u8; 512];
    match resolver.getent(&mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.name, "ten"),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    assert_eq!(resolver.endent(), NssStatus::Success);
    assert_eq!(resolver.endent(), NssStatus::Success);
    Ok(())
}

#[test]
fn small_buffer_reports_try_again_and_preserves_position() -> Result<()> {
    let path = write_sample("smallbuf")?;
    let resolver = SnapshotResolver::new(&path);

    // 8 байт не хватит ни одной записи.
    let mut small = vec![0u8; 8];
    let res = resolver.getent(&mut small);
    assert_eq!(res.status(), NssStatus::TryAgain);
    assert_eq!(res.errno(), Errno::Range);

    // Retry с большим буфером видит ту же (первую) запись.
    let mut buf = vec![0u8; 512];
    match resolver.getent(&mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.uid, 10),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    // И позиция продвинулась ровно на одну запись.
    let mut buf2 = vec![0u8; 512];
    match resolver.getent(&mut buf2) {
        NssResult::Found(entry) => assert_eq!(entry.uid, 20),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    Ok(())
}

#[test]
fn keyed_lookup_with_small_buffer_reports_try_again_and_closes() -> Result<()> {
    let path = write_sample("smallfind")?;
    let resolver = SnapshotResolver::new(&path);

    let mut small = vec![0u8; 8];
    let res = resolver.find_uid(30, &mut small);
    assert_eq!(res.status(), NssStatus::TryAgain);
    assert_eq!(res.errno(), Errno::Range);

    // Курсор закрыт: следующая итерация начинается с нуля.
    let mut buf = vec![0u8; 512];
    match resolver.getent(&mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.uid, 10),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    Ok(())
}

#[test]
fn missing_file_is_unavailable() {
    let resolver = SnapshotResolver::new(unique_root("missing").join("nope.cache"));
    assert_eq!(resolver.setent(), NssStatus::Unavailable);

    let mut buf = vec![0u8; 512];
    assert_eq!(resolver.getent(&mut buf).status(), NssStatus::Unavailable);
    assert_eq!(
        resolver.find_uid(1, &mut buf).status(),
        NssStatus::Unavailable
    );
    // endent остаётся no-op success.
    assert_eq!(resolver.endent(), NssStatus::Success);
}

#[test]
fn malformed_line_is_an_error_not_a_miss() -> Result<()> {
    let root = unique_root("badline");
    fs::create_dir_all(&root)?;
    let path = root.join("passwd.cache");
    fs::write(&path, "ten:x:10:10:Ten:/home/ten:/bin/bash\ngarbage-line\n")?;

    let resolver = SnapshotResolver::new(&path);
    let mut buf = vec![0u8; 512];
    assert!(resolver.getent(&mut buf).is_found());

    let res = resolver.getent(&mut buf);
    assert_eq!(res.status(), NssStatus::Error);
    assert_eq!(res.errno(), Errno::Inval);
    Ok(())
}
