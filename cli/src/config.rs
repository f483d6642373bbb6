use std::path::PathBuf;

use anyhow::Context as _;
use heist_core::Config;
use serde::Deserialize;

use crate::{cmd::GlobalArgs, util};

pub const APP_NAME: &str = "heist-judge";

/// `HEIST_*` environment variables that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvOverrides {
    pub max_code_size: Option<usize>,
    pub max_input_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub lang_location: Option<PathBuf>,
}

impl EnvOverrides {
    pub const PREFIX: &str = "HEIST_";

    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .context("Invalid HEIST_* environment variable")
    }

    pub fn apply(self, cfg: &mut Config) {
        let EnvOverrides {
            max_code_size,
            max_input_size,
            timeout_secs,
            lang_location,
        } = self;

        if let Some(v) = max_code_size {
            cfg.limits.max_code_size = v;
        }
        if let Some(v) = max_input_size {
            cfg.limits.max_input_size = v;
        }
        if let Some(v) = timeout_secs {
            cfg.limits.timeout_secs = v;
        }
        if let Some(v) = lang_location {
            cfg.runner.lang_location = v;
        }
    }
}

pub fn global_config_filepath() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(Config::FILENAME))
}

/// `--config`, else the nearest heist.toml above the current dir, else the user's one.
pub fn find_config_file(args: &GlobalArgs) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = &args.config {
        return Ok(Some(path.clone()));
    }
    if let Some(path) = Config::find_file_in_ancestors(util::current_dir()?) {
        return Ok(Some(path));
    }
    Ok(global_config_filepath().filter(|path| path.is_file()))
}

pub fn load(args: &GlobalArgs) -> anyhow::Result<Config> {
    let mut cfg = match find_config_file(args)? {
        Some(path) => {
            log::debug!(
                "Using config {}",
                util::replace_homedir_to_tilde(&path).to_string_lossy()
            );
            Config::from_toml_file(path)?
        }
        None => {
            log::debug!("No {} found, using defaults", Config::FILENAME);
            Config::default()
        }
    };
    EnvOverrides::from_env()?.apply(&mut cfg);
    Ok(cfg)
}

/// The configured judge command, or this executable's `judge` subcommand.
pub fn judge_command(cfg: &Config) -> anyhow::Result<Vec<String>> {
    if !cfg.host.judge_command.is_empty() {
        return Ok(cfg.host.judge_command.clone());
    }
    let exe = std::env::current_exe().context("Cannot locate the heist-judge executable")?;
    Ok(vec![
        exe.to_string_lossy().into_owned(),
        "judge".to_owned(),
        "--session".to_owned(),
    ])
}
