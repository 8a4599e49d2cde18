use anyhow::{anyhow, Result};

use CloudNSS::{Config, NssResult, RemoteResolver};

pub fn exec(
    endpoint: Option<String>,
    uid: Option<u32>,
    name: Option<String>,
    bufsize: usize,
) -> Result<()> {
    let mut cfg = Config::from_env();
    if let Some(e) = endpoint {
        cfg = cfg.with_endpoint(e);
    }
    let resolver = RemoteResolver::from_config(&cfg);

    let mut buf = vec![0u8; bufsize.max(1)];
    let res = match (uid, name) {
        (Some(uid), None) => resolver.get_uid(uid, &mut buf),
        (None, Some(ref name)) => resolver.get_name(name, &mut buf),
        _ => return Err(anyhow!("pass exactly one of --uid / --name")),
    };

    match res {
        NssResult::Found(entry) => {
            // Печатаем в формате passwd-строки.
            println!(
                "{}:x:{}:{}:{}:{}:{}",
                entry.name, entry.uid, entry.gid, entry.gecos, entry.dir, entry.shell
            );
            Ok(())
        }
        NssResult::NotFound => Err(anyhow!("not found")),
        NssResult::TryAgain(cause) => Err(anyhow!(
            "buffer too small ({:?}) — retry with a bigger --bufsize",
            cause
        )),
        NssResult::Unavailable => Err(anyhow!("directory unavailable")),
        NssResult::Error(cause) => Err(anyhow!("lookup failed ({:?})", cause)),
    }
}
