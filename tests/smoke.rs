//! End-to-end: удалённый каталог -> refresh -> snapshot-файл -> lookups.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tiny_http::{Response, Server};

use CloudNSS::{
    refresh_snapshot, HttpFetcher, NssResult, NssStatus, RemoteResolver, SnapshotResolver,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("cnsstest-smoke-{prefix}-{pid}-{t}-{id}"))
}

fn spawn_stub(routes: HashMap<String, (u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let server = Server::http("127.0.0.1:0").expect("bind stub server");
    let addr = server.server_addr().to_ip().expect("tcp listen addr");
    let log = Arc::new(Mutex::new(Vec::new()));
    let request_log = log.clone();
    thread::spawn(move || {
        for rq in server.incoming_requests() {
            let url = rq.url().to_string();
            request_log.lock().unwrap().push(url.clone());
            let (status, body) = routes
                .get(&url)
                .cloned()
                .unwrap_or((404, String::new()));
            let _ = rq.respond(Response::from_string(body).with_status_code(status));
        }
    });
    (format!("http://{}/", addr), log)
}

#[test]
fn refresh_writes_a_sorted_snapshot_the_file_resolver_can_search() -> Result<()> {
    // Каталог отдаёт записи НЕ по порядку uid.
    let page = r#"{"users":[
        {"username":"thirty","uid":30,"gid":30},
        {"username":"ten","uid":10,"gid":10},
        {"username":"twenty","uid":20,"gid":20}
    ]}"#;
    let (endpoint, _log) = spawn_stub(HashMap::from([(
        "/users?pagesize=8&page=0".to_string(),
        (200, page.to_string()),
    )]));
    let remote = RemoteResolver::with_fetcher(&endpoint, HttpFetcher::new(2000), 64, 8);

    let root = unique_root("refresh");
    let snapshot_path = root.join("passwd.cache");
    let stats = refresh_snapshot(&remote, &snapshot_path)?;
    assert_eq!(stats.users, 3);

    // Файл отсортирован по uid.
    let text = fs::read_to_string(&snapshot_path)?;
    let uids: Vec<&str> = text
        .lines()
        .map(|l| l.split(':').nth(2).expect("uid field"))
        .collect();
    assert_eq!(uids, vec!["10", "20", "30"]);

    // Снимок ищется файловым ресолвером; ранний выход на отсутствующем uid.
    let local = SnapshotResolver::new(&snapshot_path);
    let mut buf = vec![0u8; 512];
    match local.find_uid(20, &mut buf) {
        NssResult::Found(entry) => assert_eq!(entry.name, "twenty"),
        other => panic!("expected Found, got {:?}", other.status()),
    }
    let mut buf = vec![0u8; 512];
    assert_eq!(local.find_uid(25, &mut buf).status(), NssStatus::NotFound);

    // Повторный refresh перезаписывает атомарно (tmp не остаётся).
    refresh_snapshot(&remote, &snapshot_path)?;
    assert!(!root.join("passwd.cache.tmp").exists());
    Ok(())
}

#[test]
fn remote_and_snapshot_agree_on_the_same_user() -> Result<()> {
    let page = r#"{"users":[{"username":"alice","uid":1001,"gid":1001,"gecos":"Alice","homeDirectory":"/home/alice","shell":"/bin/bash"}]}"#;
    let (endpoint, _log) = spawn_stub(HashMap::from([
        (
            "/users?pagesize=8&page=0".to_string(),
            (200, page.to_string()),
        ),
        (
            "/users?uid=1001".to_string(),
            (
                200,
                r#"{"username":"alice","uid":1001,"gid":1001,"gecos":"Alice","homeDirectory":"/home/alice","shell":"/bin/bash"}"#.to_string(),
            ),
        ),
    ]));
    let remote = RemoteResolver::with_fetcher(&endpoint, HttpFetcher::new(2000), 64, 8);

    let root = unique_root("agree");
    let snapshot_path = root.join("passwd.cache");
    refresh_snapshot(&remote, &snapshot_path)?;

    let local = SnapshotResolver::new(&snapshot_path);
    let mut rbuf = vec![0u8; 512];
    let mut lbuf = vec![0u8; 512];
    let via_remote = match remote.get_uid(1001, &mut rbuf) {
        NssResult::Found(e) => (e.name.to_string(), e.uid, e.gid, e.dir.to_string()),
        other => panic!("remote lookup failed: {:?}", other.status()),
    };
    let via_snapshot = match local.find_uid(1001, &mut lbuf) {
        NssResult::Found(e) => (e.name.to_string(), e.uid, e.gid, e.dir.to_string()),
        other => panic!("snapshot lookup failed: {:?}", other.status()),
    };
    assert_eq!(via_remote, via_snapshot);
    Ok(())
}
