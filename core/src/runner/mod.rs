//! Executing submitted code: the wire-level results and the runners that produce them.

pub mod local;
pub mod remote;

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use local::LangRunner;
pub use remote::RemoteRunner;

use crate::protocol::ProtocolError;
use crate::template::TemplateError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation_result: Option<RunResult>,
}

impl CompiledRunResult {
    pub fn compile_failed(compilation: RunResult) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_status: 1,
            compilation_result: Some(compilation),
        }
    }

    pub fn compilation_failed(&self) -> bool {
        self.compilation_result
            .as_ref()
            .is_some_and(|c| !c.success())
    }

    /// The `(stdout, stderr)` to show: the compiler's when compilation failed.
    pub fn displayed_streams(&self) -> (&str, &str) {
        match &self.compilation_result {
            Some(c) if !c.success() => (&c.stdout, &c.stderr),
            _ => (&self.stdout, &self.stderr),
        }
    }
}

impl From<RunResult> for CompiledRunResult {
    fn from(r: RunResult) -> Self {
        Self {
            stdout: r.stdout,
            stderr: r.stderr,
            exit_status: r.exit_status,
            compilation_result: None,
        }
    }
}

/// Phases of a session that get their own share of wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Compile,
    Run,
    Judge,
}

/// A submission refused instead of producing a result: too large to execute, or out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunRejection {
    CodeTooLarge,
    InputTooLarge,
    TimeLimitExceeded {
        phase: Phase,
        #[serde(with = "secs_f64")]
        limit: Duration,
    },
}

impl fmt::Display for RunRejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunRejection::CodeTooLarge => write!(f, "code is too large"),
            RunRejection::InputTooLarge => write!(f, "input is too large"),
            RunRejection::TimeLimitExceeded { phase, limit } => {
                write!(f, "{} used more than {:?}", phase, limit)
            }
        }
    }
}

/// What the runner sends back for one run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunResponse {
    Rejected(RunRejection),
    Completed(CompiledRunResult),
}

/// Optional byte limits on what may be executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_code_size: Option<usize>,
    pub max_input_size: Option<usize>,
}

impl SizeLimits {
    pub fn check(&self, code: &str, input: Option<&str>) -> Result<(), RunRejection> {
        if self.max_code_size.is_some_and(|max| code.len() > max) {
            return Err(RunRejection::CodeTooLarge);
        }
        let input_len = input.map_or(0, str::len);
        if self.max_input_size.is_some_and(|max| input_len > max) {
            return Err(RunRejection::InputTooLarge);
        }
        Ok(())
    }

    /// Human readable explanation of a rejection under these limits.
    pub fn describe(&self, rejection: RunRejection) -> String {
        let limit = |max: Option<usize>| max.map_or("the allowed".to_owned(), |m| m.to_string());
        match rejection {
            RunRejection::CodeTooLarge => format!(
                "Expected code to have at most {} bytes",
                limit(self.max_code_size)
            ),
            RunRejection::InputTooLarge => format!(
                "Expected input to have at most {} bytes",
                limit(self.max_input_size)
            ),
            RunRejection::TimeLimitExceeded { phase, limit } => format!(
                "Time limit exceeded: {} took longer than {:?} in total",
                phase, limit
            ),
        }
    }
}

/// Wall time spent in each phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timers {
    #[serde(default, with = "secs_f64")]
    pub run: Duration,
    #[serde(default, with = "secs_f64")]
    pub compile: Duration,
    #[serde(default, with = "secs_f64")]
    pub judge: Duration,
}

impl Timers {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Run => self.run,
            Phase::Compile => self.compile,
            Phase::Judge => self.judge,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::Run => &mut self.run,
            Phase::Compile => &mut self.compile,
            Phase::Judge => &mut self.judge,
        }
    }
}

/// Total wall time each phase may use over a whole session. `None` leaves a phase unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBudget {
    pub compile: Option<Duration>,
    pub run: Option<Duration>,
    pub judge: Option<Duration>,
}

impl TimeBudget {
    pub fn limit(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Compile => self.compile,
            Phase::Run => self.run,
            Phase::Judge => self.judge,
        }
    }

    /// What is left of `phase`'s budget after `used`.
    pub fn remaining(&self, phase: Phase, used: &Timers) -> Option<Duration> {
        self.limit(phase)
            .map(|limit| limit.saturating_sub(used.get(phase)))
    }

    /// Adds a language's extra allowance to every bounded phase.
    pub fn extended_by(self, extra: &Timers) -> Self {
        Self {
            compile: self.compile.map(|d| d + extra.compile),
            run: self.run.map(|d| d + extra.run),
            judge: self.judge.map(|d| d + extra.judge),
        }
    }

    pub fn exceeded(&self, phase: Phase) -> RunRejection {
        RunRejection::TimeLimitExceeded {
            phase,
            limit: self.limit(phase).unwrap_or_default(),
        }
    }
}

pub(crate) mod secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Invalid command template in language '{lang}': {source}")]
    Template {
        lang: String,
        #[source]
        source: TemplateError,
    },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to communicate with '{command}': {source}")]
    Communicate {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fs(#[from] fsutil::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Invalid language extension '{0}'")]
    InvalidExtension(String),

    #[error("Language '{0}' has an empty run command")]
    EmptyRunCommand(String),

    #[error("Cannot create work dir: {0}")]
    WorkDir(#[source] std::io::Error),
}

/// Executes one piece of code with optional stdin.
#[async_trait]
pub trait CodeRunner: Send {
    async fn run(&mut self, code: &str, input: Option<&str>) -> Result<RunResponse, RunnerError>;

    /// Compile and run time spent so far, when the runner measures it.
    fn timers(&self) -> Timers {
        Timers::default()
    }
}
