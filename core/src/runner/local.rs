use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Instant,
};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
};

use super::{
    CodeRunner, CompiledRunResult, Phase, RunRejection, RunResponse, RunResult, RunnerError,
    SizeLimits, TimeBudget, Timers,
};
use crate::lang::Lang;
use crate::template::{CommandTemplate, Locations, TemplateError};

#[derive(Debug)]
enum WorkDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(d) => d.path(),
            WorkDir::Fixed(p) => p,
        }
    }
}

/// Compiles and runs submissions of one language as local subprocesses.
///
/// Compiled artifacts are cached per exact source text for the lifetime of the runner and live in
/// its work dir, which is removed on drop unless it was given explicitly.
///
/// Compile and run time accumulate over the runner's lifetime. Once a phase has used up its
/// [`TimeBudget`], the process is killed and the request is rejected with
/// [`RunRejection::TimeLimitExceeded`].
#[derive(Debug)]
pub struct LangRunner {
    lang: Lang,
    compile_cmd: Option<CommandTemplate>,
    run_cmd: CommandTemplate,
    sandbox: CommandTemplate,
    extra_env: Vec<(String, String)>,
    lang_location: PathBuf,
    work_dir: WorkDir,
    limits: SizeLimits,
    budget: TimeBudget,
    compiled_programs: HashMap<String, PathBuf>,
    timers: Timers,
}

enum Compilation {
    NotNeeded(PathBuf),
    Cached(PathBuf),
    Built(PathBuf, RunResult),
    Failed(RunResult),
    OutOfTime(RunRejection),
}

impl LangRunner {
    const DEFAULT_LANG_LOCATION: &str = "/lang";

    pub fn new(lang: Lang) -> Result<Self, RunnerError> {
        if lang.run_command.is_empty() {
            return Err(RunnerError::EmptyRunCommand(lang.name));
        }
        if fsutil::child_path("/", &lang.source_file_name()).is_none() {
            return Err(RunnerError::InvalidExtension(lang.extension));
        }

        let template_err = |source: TemplateError| RunnerError::Template {
            lang: lang.name.clone(),
            source,
        };
        let run_cmd = CommandTemplate::parse(&lang.run_command).map_err(template_err)?;
        let compile_cmd = lang
            .is_compiled()
            .then(|| CommandTemplate::parse(&lang.compile_command))
            .transpose()
            .map_err(template_err)?;
        let work_dir = TempDir::new().map_err(RunnerError::WorkDir)?;

        Ok(Self {
            lang,
            compile_cmd,
            run_cmd,
            sandbox: CommandTemplate::default(),
            extra_env: Vec::new(),
            lang_location: Self::DEFAULT_LANG_LOCATION.into(),
            work_dir: WorkDir::Temp(work_dir),
            limits: SizeLimits::default(),
            budget: TimeBudget::default(),
            compiled_programs: HashMap::new(),
            timers: Timers::default(),
        })
    }

    pub fn lang_location(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lang_location = dir.into();
        self
    }

    /// Keeps sources and artifacts in `dir` instead of a private temporary directory.
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Result<Self, RunnerError> {
        let dir = dir.into();
        fsutil::mkdir_all(&dir)?;
        self.work_dir = WorkDir::Fixed(dir);
        Ok(self)
    }

    /// Command prefix every compile and run goes through, e.g. a `bwrap ... --` invocation.
    /// The same placeholders as in language commands are available.
    pub fn sandbox<S: AsRef<str>>(mut self, prefix: &[S]) -> Result<Self, RunnerError> {
        self.sandbox = CommandTemplate::parse(prefix).map_err(|source| RunnerError::Template {
            lang: self.lang.name.clone(),
            source,
        })?;
        Ok(self)
    }

    pub fn env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_env.extend(env);
        self
    }

    pub fn limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn budget(mut self, budget: TimeBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn get_lang(&self) -> &Lang {
        &self.lang
    }

    pub fn get_work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn cached_programs(&self) -> usize {
        self.compiled_programs.len()
    }

    fn source_path(&self) -> PathBuf {
        self.work_dir.path().join(self.lang.source_file_name())
    }

    fn command_line(&self, cmd: &CommandTemplate, file: &Path, output: &Path) -> Vec<String> {
        let loc = Locations {
            lang: &self.lang_location,
            file,
            output,
        };
        let mut argv = self.sandbox.render(&loc);
        argv.extend(cmd.render(&loc));
        argv
    }

    async fn compile(&mut self, code: &str, source: &Path) -> Result<Compilation, RunnerError> {
        if let Some(artifact) = self.compiled_programs.get(code) {
            log::debug!("Compile cache hit: {}", artifact.to_string_lossy());
            return Ok(Compilation::Cached(artifact.clone()));
        }

        let artifact = self
            .work_dir
            .path()
            .join(format!("executable{}", self.compiled_programs.len()));
        let argv = match &self.compile_cmd {
            Some(cmd) => self.command_line(cmd, source, &artifact),
            None => return Ok(Compilation::NotNeeded(self.work_dir.path().join("output"))),
        };

        log::debug!("Compile cache miss, building {}", artifact.to_string_lossy());
        // A failed build leaves its slot to the next one, maybe with a partial artifact in it.
        fsutil::remove_file_if_exists(&artifact)?;
        let result = match self.timed_exec(Phase::Compile, &argv, b"").await? {
            Ok(result) => result,
            Err(rejection) => return Ok(Compilation::OutOfTime(rejection)),
        };

        if !result.success() {
            log::info!("Compilation failed: exit status {}", result.exit_status);
            return Ok(Compilation::Failed(result));
        }
        self.compiled_programs.insert(code.to_owned(), artifact.clone());
        Ok(Compilation::Built(artifact, result))
    }

    /// Compiles `code` unless it is cached, then runs it with `input` on stdin.
    ///
    /// A failed compilation is not an error: the result carries it and nothing is run. Running out
    /// of compile or run time is a [`RunRejection::TimeLimitExceeded`].
    pub async fn compile_and_run(
        &mut self,
        code: &str,
        input: Option<&str>,
    ) -> Result<RunResponse, RunnerError> {
        let source = self.source_path();
        fsutil::write(&source, code)?;

        let (output, compilation_result) = match self.compile(code, &source).await? {
            Compilation::NotNeeded(output) | Compilation::Cached(output) => (output, None),
            Compilation::Built(output, result) => (output, Some(result)),
            Compilation::Failed(result) => {
                return Ok(RunResponse::Completed(CompiledRunResult::compile_failed(result)))
            }
            Compilation::OutOfTime(rejection) => return Ok(RunResponse::Rejected(rejection)),
        };

        let argv = self.command_line(&self.run_cmd, &source, &output);
        let input = input.unwrap_or_default();

        let result = match self.timed_exec(Phase::Run, &argv, input.as_bytes()).await? {
            Ok(result) => result,
            Err(rejection) => return Ok(RunResponse::Rejected(rejection)),
        };

        Ok(RunResponse::Completed(CompiledRunResult {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_status: result.exit_status,
            compilation_result,
        }))
    }

    /// Runs `argv` within what is left of `phase`'s budget and charges the time spent to it.
    async fn timed_exec(
        &mut self,
        phase: Phase,
        argv: &[String],
        input: &[u8],
    ) -> Result<Result<RunResult, RunRejection>, RunnerError> {
        let remaining = self.budget.remaining(phase, &self.timers);
        if remaining.is_some_and(|left| left.is_zero()) {
            log::info!("No {} time left, not starting: {}", phase, argv.join(" "));
            return Ok(Err(self.budget.exceeded(phase)));
        }

        let started = Instant::now();
        let running = exec(argv, &self.lang.env, &self.extra_env, input);
        let result = match remaining {
            Some(left) => tokio::time::timeout(left, running).await.ok(),
            None => Some(running.await),
        };
        *self.timers.get_mut(phase) += started.elapsed();

        match result {
            Some(result) => result.map(Ok),
            None => {
                // dropping the exec future killed the process
                log::warn!("{} exceeded its time budget", phase);
                Ok(Err(self.budget.exceeded(phase)))
            }
        }
    }
}

#[async_trait]
impl CodeRunner for LangRunner {
    async fn run(&mut self, code: &str, input: Option<&str>) -> Result<RunResponse, RunnerError> {
        if let Err(rejection) = self.limits.check(code, input) {
            log::info!("Refusing to run: {}", rejection);
            return Ok(RunResponse::Rejected(rejection));
        }
        self.compile_and_run(code, input).await
    }

    fn timers(&self) -> Timers {
        self.timers
    }
}

fn missing_pipe(command: &str, name: &str) -> RunnerError {
    RunnerError::Communicate {
        command: command.to_owned(),
        source: io::Error::new(io::ErrorKind::Other, format!("Failed to open {}", name)),
    }
}

/// Runs `argv` to completion, feeding `input` and capturing both output streams in full.
async fn exec(
    argv: &[String],
    lang_env: &[(String, String)],
    extra_env: &[(String, String)],
    input: &[u8],
) -> Result<RunResult, RunnerError> {
    let command = argv.join(" ");
    let Some((program, args)) = argv.split_first() else {
        return Err(missing_pipe(&command, "command"));
    };
    log::info!("Running: {}", command);

    let mut proc = Command::new(program)
        .args(args)
        .envs(lang_env.iter().chain(extra_env).map(|(k, v)| (k, v)))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            command: command.clone(),
            source,
        })?;
    let mut stdin = proc.stdin.take().ok_or_else(|| missing_pipe(&command, "stdin"))?;
    let mut stdout = proc.stdout.take().ok_or_else(|| missing_pipe(&command, "stdout"))?;
    let mut stderr = proc.stderr.take().ok_or_else(|| missing_pipe(&command, "stderr"))?;

    let feed = async move {
        let res = stdin.write_all(input).await;
        drop(stdin); // NOTE: the program only sees EOF once stdin is closed
        match res {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                log::warn!("Program exited before reading all of its input");
                Ok(())
            }
            res => res,
        }
    };

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let (_, _, _, status) = tokio::try_join!(
        feed,
        stdout.read_to_end(&mut stdout_buf),
        stderr.read_to_end(&mut stderr_buf),
        proc.wait(),
    )
    .map_err(|source| RunnerError::Communicate {
        command: command.clone(),
        source,
    })?;

    Ok(RunResult {
        stdout: String::from_utf8_lossy(&stdout_buf).into(),
        stderr: String::from_utf8_lossy(&stderr_buf).into(),
        exit_status: exit_code(status),
    })
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
