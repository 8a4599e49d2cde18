use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

mod cli;
mod cmd_groups;
mod cmd_lookup;
mod cmd_refresh;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=debug cloudnss refresh
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Refresh {
            endpoint,
            out,
            page_records,
        } => cmd_refresh::exec(endpoint, out, page_records),

        cli::Cmd::Lookup {
            endpoint,
            uid,
            name,
            bufsize,
        } => cmd_lookup::exec(endpoint, uid, name, bufsize),

        cli::Cmd::Groups {
            endpoint,
            user,
            limit,
        } => cmd_groups::exec(endpoint, user, limit),
    }
}
