use std::path::PathBuf;

use heist_core::session;

use super::{GlobalArgs, SubcmdResult};
use crate::{config, util};

/// Judge a session in this process: compile, run and judge, printing one JSON line per test case.
#[derive(Debug, clap::Args)]
pub struct Args {
    /// Read the session from this file instead of stdin.
    #[arg(long)]
    pub session_file: Option<PathBuf>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args)?;
    let session = util::read_session(args.session_file.as_deref()).await?;
    let limits = session.limits(&cfg.limits);
    let budget = session.time_budget(&cfg.limits);

    let verdict =
        session::run_in_process(&session, &cfg.runner, limits, budget, tokio::io::stdout()).await?;
    log::info!("Verdict: pass={}", verdict.pass);
    Ok(())
}
