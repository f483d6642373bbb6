use std::path::PathBuf;

use anyhow::Context as _;
use heist_core::judge::JudgeProgram;

use super::{GlobalArgs, SubcmdResult};
use crate::print_success;

/// Load a judge program and report whether it is valid.
#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub judge_file: PathBuf,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let text = fsutil::read_to_string(&args.judge_file)?;
    let program = JudgeProgram::load(&text)
        .with_context(|| format!("Invalid judge program: {}", args.judge_file.to_string_lossy()))?;

    print_success!(
        "OK: {} steps ({})",
        program.steps.len(),
        args.judge_file.to_string_lossy()
    );
    for (i, step) in program.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step.kind());
    }
    Ok(())
}
