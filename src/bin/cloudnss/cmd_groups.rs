use anyhow::{anyhow, Result};

use CloudNSS::{expand_groups, Config, GidBuf, NssResult, RemoteResolver};

pub fn exec(endpoint: Option<String>, user: String, limit: i64) -> Result<()> {
    let mut cfg = Config::from_env();
    if let Some(e) = endpoint {
        cfg = cfg.with_endpoint(e);
    }
    let resolver = RemoteResolver::from_config(&cfg);

    let mut gids = GidBuf::with_capacity(8);
    match expand_groups(&resolver, &user, None, &mut gids, limit) {
        NssResult::Found(appended) => {
            let rendered: Vec<String> = gids.as_slice().iter().map(|g| g.to_string()).collect();
            println!("{} ({} groups): {}", user, appended, rendered.join(" "));
            Ok(())
        }
        NssResult::NotFound => Err(anyhow!("no memberships for '{}'", user)),
        NssResult::TryAgain(cause) => Err(anyhow!(
            "gid array hit its ceiling ({:?}) after {} entries — raise --limit",
            cause,
            gids.len()
        )),
        NssResult::Unavailable => Err(anyhow!("directory unavailable")),
        NssResult::Error(cause) => Err(anyhow!("expansion failed ({:?})", cause)),
    }
}
