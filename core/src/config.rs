use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::lang::Lang;
use crate::runner::{LangRunner, RunnerError, SizeLimits, TimeBudget};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub runner: RunnerConfig,
    pub limits: LimitsConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub lang_location: PathBuf,
    pub work_dir: Option<PathBuf>,
    pub sandbox: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            lang_location: "/lang".into(),
            work_dir: None,
            sandbox: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_code_size: usize,
    pub max_input_size: usize,
    pub max_test_cases: usize,
    pub max_display_len: Option<usize>,
    pub timeout_secs: u64,
    /// Per-session totals for each phase, before a language's `extraRuntime` is added.
    pub compile_timeout_ms: u64,
    pub run_timeout_ms: u64,
    pub judge_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_size: 64 * 1024,
            max_input_size: 64 * 1024,
            max_test_cases: 50,
            max_display_len: None,
            timeout_secs: 10,
            compile_timeout_ms: 1000,
            run_timeout_ms: 3000,
            judge_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Command that runs the judge side; the session JSON is appended as its last argument.
    pub judge_command: Vec<String>,
}

impl Config {
    pub const FILENAME: &str = "heist.toml";

    pub fn example_toml() -> &'static str {
        include_str!("../assets/heist.toml")
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Finds the config file in ancestor dirs, including the current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }
}

impl RunnerConfig {
    pub fn build_runner(&self, lang: Lang, limits: SizeLimits) -> StdResult<LangRunner, RunnerError> {
        let runner = LangRunner::new(lang)?
            .lang_location(&self.lang_location)
            .sandbox(self.sandbox.as_slice())?
            .env(self.env.clone())
            .limits(limits);
        match &self.work_dir {
            Some(dir) => runner.work_dir(dir),
            None => Ok(runner),
        }
    }
}

impl LimitsConfig {
    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits {
            max_code_size: Some(self.max_code_size),
            max_input_size: Some(self.max_input_size),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn time_budget(&self) -> TimeBudget {
        TimeBudget {
            compile: Some(Duration::from_millis(self.compile_timeout_ms)),
            run: Some(Duration::from_millis(self.run_timeout_ms)),
            judge: Some(Duration::from_millis(self.judge_timeout_ms)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn example_toml_should_be_parsable() {
        let cfg = dbg!(Config::from_toml(Config::example_toml())).unwrap();

        let Config {
            source_config_file,
            runner,
            limits,
            host,
        } = cfg;

        assert_eq!(source_config_file, None);
        assert_eq!(runner.lang_location, Path::new("/lang"));
        assert_eq!(runner.work_dir, None);
        assert!(runner.sandbox.is_empty());
        assert_eq!(runner.env.get("LANG").map(String::as_str), Some("C.UTF-8"));

        assert_eq!(limits.max_code_size, 65536);
        assert_eq!(limits.max_input_size, 65536);
        assert_eq!(limits.max_test_cases, 50);
        assert_eq!(limits.max_display_len, Some(16384));
        assert_eq!(limits.timeout(), Duration::from_secs(10));
        assert_eq!(
            limits.time_budget(),
            TimeBudget {
                compile: Some(Duration::from_secs(1)),
                run: Some(Duration::from_secs(3)),
                judge: Some(Duration::from_secs(1)),
            }
        );

        assert!(host.judge_command.is_empty());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg = Config::from_toml("[limits]\ntimeout_secs = 3").unwrap();
        assert_eq!(cfg.limits.timeout_secs, 3);
        assert_eq!(cfg.limits.max_code_size, 64 * 1024);
        assert_eq!(cfg.runner, RunnerConfig::default());
        assert_eq!(
            cfg.limits.size_limits(),
            SizeLimits {
                max_code_size: Some(65536),
                max_input_size: Some(65536),
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[runner]\nlang_dir = \"/x\"").is_err());
    }

    #[test]
    fn find_file_in_ancestors() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        fsutil::mkdir_all(&nested).unwrap();
        assert_eq!(Config::find_file_in_ancestors(&nested), None);

        fsutil::write(root.path().join(Config::FILENAME), "").unwrap();
        assert_eq!(
            Config::find_file_in_ancestors(&nested),
            Some(root.path().join(Config::FILENAME))
        );
        let cfg = Config::from_toml_file(root.path().join(Config::FILENAME)).unwrap();
        assert_eq!(cfg.source_config_file, Some(root.path().join(Config::FILENAME)));
    }
}
