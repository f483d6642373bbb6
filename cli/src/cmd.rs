pub mod check;
pub mod host;
pub mod judge;
pub mod run;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Config file to use instead of looking for heist.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Run(run::Args),
    Judge(judge::Args),
    Host(host::Args),
    Check(check::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Run(args) => run::exec(args, self).await,
            Judge(args) => judge::exec(args, self).await,
            Host(args) => host::exec(args, self).await,
            Check(args) => check::exec(args, self),
        }
    }
}
