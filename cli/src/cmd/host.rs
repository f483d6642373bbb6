use std::path::PathBuf;

use anyhow::Context as _;
use heist_core::host::Host;

use super::{GlobalArgs, SubcmdResult};
use crate::{config, render, util};

/// Runner side of a split session: spawns the judge and serves its run requests.
#[derive(Debug, clap::Args)]
pub struct Args {
    /// Read the session from this file instead of stdin.
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Print a colored report instead of JSON.
    #[arg(short, long)]
    pub pretty: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args)?;
    let mut session = util::read_session(args.session_file.as_deref()).await?;

    // The judge process enforces the same limits before sending anything.
    let limits = session.limits(&cfg.limits);
    session.max_code_size = limits.max_code_size;
    session.max_input_size = limits.max_input_size;

    let lang = session
        .lang
        .clone()
        .context("Session has no lang to run the code with")?;
    let budget = session.time_budget(&cfg.limits);
    let mut runner = cfg.runner.build_runner(lang, limits)?.budget(budget);
    log::info!(
        "Hosting a '{}' session in {}",
        runner.get_lang().name,
        util::replace_homedir_to_tilde(runner.get_work_dir()).to_string_lossy()
    );

    let host = Host::new(config::judge_command(&cfg)?)
        .timeout(cfg.limits.timeout())
        .max_test_cases(cfg.limits.max_test_cases)
        .max_display_len(cfg.limits.max_display_len)
        .judge_budget(budget.judge);
    let output = host.run(&session, &mut runner).await?;

    if args.pretty {
        render::print_run_lang_output(&output);
    } else {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
