use std::path::PathBuf;

use anyhow::Context as _;
use heist_core::session::{self, Session};

use super::{GlobalArgs, SubcmdResult};
use crate::{config, util};

/// Judge side of a split session: run requests go to stdout, their results come back on stdin.
#[derive(Debug, clap::Args)]
pub struct Args {
    /// Session JSON.
    #[arg(long, conflicts_with = "session_file", required_unless_present = "session_file")]
    pub session: Option<String>,

    #[arg(long)]
    pub session_file: Option<PathBuf>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args)?;
    // stdin carries run results, so the session never comes from there.
    let session = match (&args.session, &args.session_file) {
        (Some(json), _) => Session::from_json(json).context("Invalid session JSON")?,
        (None, Some(path)) => util::read_session(Some(path.as_path())).await?,
        (None, None) => anyhow::bail!("Either --session or --session-file is required"),
    };
    let limits = session.limits(&cfg.limits);

    let verdict =
        session::run_judge_side(&session, limits, tokio::io::stdin(), tokio::io::stdout()).await?;
    log::info!("Verdict: pass={}", verdict.pass);
    Ok(())
}
