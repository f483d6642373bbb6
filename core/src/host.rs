//! Runner side of a split session.
//!
//! The host spawns the judge as a child process with the session as its last argument, answers the
//! run requests it prints, and collects its test cases and verdict.

use std::{
    io,
    process::{ExitStatus, Stdio},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    process::Command,
};

use crate::protocol::{FatalError, JsonStream, JsonWriter, JudgeMessage, ProtocolError};
use crate::runner::{secs_f64, CodeRunner, RunRejection, RunResponse, RunnerError, Timers};
use crate::session::Session;
use crate::verdict::{FinalVerdict, JudgeResult};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Judge command is empty")]
    EmptyCommand,

    #[error("Failed to spawn judge '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Judge produced more than {0} test cases")]
    TooManyTestCases(usize),

    #[error("Judge used more than {0:?} of its own time")]
    JudgeTimeLimit(Duration),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Lost the judge process: {0}")]
    Io(#[from] io::Error),
}

/// Everything known about one hosted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLangOutput {
    pub tests: JudgeResult,
    /// The judge's stderr, followed by any error it reported.
    pub stderr: String,
    pub timed_out: bool,
    #[serde(with = "secs_f64")]
    pub runtime: Duration,
    pub timers: Timers,
}

#[derive(Debug, Default)]
struct Collected {
    result: JudgeResult,
    verdict: Option<FinalVerdict>,
    fatal: Option<String>,
    out_of_time: bool,
}

#[derive(Debug, Clone)]
pub struct Host {
    judge_command: Vec<String>,
    timeout: Duration,
    max_test_cases: usize,
    max_display_len: Option<usize>,
    judge_budget: Option<Duration>,
}

impl Host {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    const DEFAULT_MAX_TEST_CASES: usize = 50;
    const STDERR_GRACE: Duration = Duration::from_secs(1);

    pub fn new(judge_command: Vec<String>) -> Self {
        Self {
            judge_command,
            timeout: Self::DEFAULT_TIMEOUT,
            max_test_cases: Self::DEFAULT_MAX_TEST_CASES,
            max_display_len: None,
            judge_budget: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_test_cases(mut self, max: usize) -> Self {
        self.max_test_cases = max;
        self
    }

    pub fn max_display_len(mut self, len: Option<usize>) -> Self {
        self.max_display_len = len;
        self
    }

    /// Wall time the judge itself may use: the session's runtime minus compile and run time.
    pub fn judge_budget(mut self, budget: Option<Duration>) -> Self {
        self.judge_budget = budget;
        self
    }

    pub async fn run(
        &self,
        session: &Session,
        runner: &mut dyn CodeRunner,
    ) -> Result<RunLangOutput, HostError> {
        let started = Instant::now();
        let session_json = serde_json::to_string(session)?;

        let command = self.judge_command.join(" ");
        let Some((program, args)) = self.judge_command.split_first() else {
            return Err(HostError::EmptyCommand);
        };
        log::info!("Spawning judge: {}", command);
        let mut child = Command::new(program)
            .args(args)
            .arg(&session_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: command.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(HostError::Io(io::Error::new(
                io::ErrorKind::Other,
                "Judge process has no stdio pipes",
            )));
        };
        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf).await {
                log::warn!("Cannot read judge stderr: {}", e);
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let mut collected = Collected::default();
        let conversation = async {
            let mut messages = JsonStream::new(stdout);
            let mut requests = JsonWriter::new(stdin);
            self.serve(&mut messages, &mut requests, runner, &mut collected, started)
                .await?;
            drop(requests);
            Ok::<ExitStatus, HostError>(child.wait().await?)
        };

        let finished = match tokio::time::timeout(self.timeout, conversation).await {
            Ok(Ok(status)) => {
                if !status.success() {
                    log::warn!("Judge exited with {}", status);
                }
                true
            }
            Ok(Err(HostError::JudgeTimeLimit(limit))) => {
                log::warn!("Judge used up its budget of {:?}", limit);
                false
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                log::warn!("Judge timed out after {:?}", self.timeout);
                false
            }
        };
        if !finished {
            if let Err(e) = child.kill().await {
                log::warn!("Cannot kill judge: {}", e);
            }
        }
        let timed_out = !finished || collected.out_of_time;

        // Grandchildren of a killed judge may still hold its stderr open.
        let mut stderr = match tokio::time::timeout(Self::STDERR_GRACE, stderr_reader).await {
            Ok(Ok(stderr)) => stderr,
            _ => String::new(),
        };
        let Collected {
            mut result,
            verdict,
            fatal,
            ..
        } = collected;

        match verdict {
            Some(verdict) => {
                result.pass = verdict.pass && !timed_out;
                result.points = verdict.points;
            }
            None => {
                log::warn!("Judge finished without a verdict");
                result.pass = false;
            }
        }
        if let Some(error) = fatal {
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&error);
        }

        let runtime = started.elapsed();
        let mut timers = runner.timers();
        timers.judge = judge_time(runtime, &timers);

        Ok(RunLangOutput {
            tests: result,
            stderr,
            timed_out,
            runtime,
            timers,
        })
    }

    async fn serve<R, W>(
        &self,
        messages: &mut JsonStream<R>,
        requests: &mut JsonWriter<W>,
        runner: &mut dyn CodeRunner,
        collected: &mut Collected,
        started: Instant,
    ) -> Result<(), HostError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let message = match self.judge_budget {
                Some(limit) => {
                    let left = limit.saturating_sub(judge_time(started.elapsed(), &runner.timers()));
                    tokio::time::timeout(left, messages.next::<JudgeMessage>())
                        .await
                        .map_err(|_| HostError::JudgeTimeLimit(limit))??
                }
                None => messages.next::<JudgeMessage>().await?,
            };
            let Some(message) = message else {
                break;
            };
            match message {
                JudgeMessage::RunRequest(request) => {
                    let response = runner.run(&request.code, request.input.as_deref()).await?;
                    if let RunResponse::Rejected(RunRejection::TimeLimitExceeded { .. }) = response {
                        collected.out_of_time = true;
                    }
                    requests.write_line(&response).await?;
                }
                JudgeMessage::TestCase(mut case) => {
                    if collected.result.test_cases.len() >= self.max_test_cases {
                        return Err(HostError::TooManyTestCases(self.max_test_cases));
                    }
                    if let Some(len) = self.max_display_len {
                        case.truncate(len);
                    }
                    collected.result.test_cases.push(case);
                }
                JudgeMessage::FinalVerdict(verdict) => {
                    collected.verdict = Some(verdict);
                }
                JudgeMessage::Fatal(FatalError { error }) => {
                    log::error!("Judge failed: {}", error);
                    collected.fatal = Some(error);
                }
            }
        }
        Ok(())
    }
}

/// Wall time not spent compiling or running submissions.
fn judge_time(elapsed: Duration, timers: &Timers) -> Duration {
    elapsed.saturating_sub(timers.run + timers.compile)
}
