use serde::Serialize;
use tokio::{io::AsyncWrite, sync::mpsc};

use super::{Judge, JudgeError, JudgeProgram};
use crate::context::{Context, Event};
use crate::protocol::{FatalError, ProtocolError, SharedWriter};
use crate::runner::{CodeRunner, SizeLimits};
use crate::verdict::{FinalVerdict, PassState, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DriverState {
    Loading,
    Running,
    Draining,
    Done,
}

/// Runs one judge program against one submission and writes the session output.
///
/// The judge future and the event loop are polled together on the current task: each run request
/// suspends the judge until the runner answered, and each emitted case is written before the next
/// event is looked at.
pub struct Driver<W> {
    out: SharedWriter<W>,
    limits: SizeLimits,
    seed: Option<u64>,
    state: DriverState,
}

impl<W> Driver<W>
where
    W: AsyncWrite + Unpin + Send,
{
    const CHANNEL_CAPACITY: usize = 16;

    pub fn new(out: SharedWriter<W>) -> Self {
        Self {
            out,
            limits: SizeLimits::default(),
            seed: None,
            state: DriverState::Loading,
        }
    }

    /// Limits quoted when a rejected submission is reported.
    pub fn limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    fn transition(&mut self, to: DriverState) {
        log::debug!("Driver: {} -> {}", self.state, to);
        self.state = to;
    }

    /// Loads `judge_text` as a [`JudgeProgram`] and drives it.
    pub async fn run_program(
        &mut self,
        judge_text: &str,
        code: &str,
        runner: &mut dyn CodeRunner,
    ) -> Result<FinalVerdict, JudgeError> {
        let program = match JudgeProgram::load(judge_text) {
            Ok(program) => program,
            Err(e) => {
                let e = JudgeError::from(e);
                self.abort(&e).await;
                return Err(e);
            }
        };
        self.drive(&program, code, runner).await
    }

    pub async fn drive(
        &mut self,
        judge: &dyn Judge,
        code: &str,
        runner: &mut dyn CodeRunner,
    ) -> Result<FinalVerdict, JudgeError> {
        self.transition(DriverState::Running);

        let (tx, mut rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let mut ctx = Context::new(code, tx);
        if let Some(seed) = self.seed {
            ctx = ctx.with_seed(seed);
        }
        let producer = async move {
            let verdict = judge.judge(&mut ctx).await;
            drop(ctx);
            verdict
        };
        tokio::pin!(producer);

        let mut verdict = None;
        loop {
            tokio::select! {
                v = &mut producer, if verdict.is_none() => {
                    self.transition(DriverState::Draining);
                    verdict = Some(v);
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle(event, runner).await {
                            return self.finish(Err(e.into())).await;
                        }
                    }
                    None => break,
                },
            }
        }

        let verdict = verdict.unwrap_or(Err(JudgeError::ChannelClosed));
        self.finish(verdict).await
    }

    async fn handle(&mut self, event: Event, runner: &mut dyn CodeRunner) -> Result<(), ProtocolError> {
        match event {
            Event::Emit(case) => self.out.lock().await.write_line(&case).await,
            Event::Run { code, input, reply } => {
                let response = runner.run(&code, input.as_deref()).await;
                if reply.send(response).is_err() {
                    log::warn!("Judge program went away before its run finished");
                }
                Ok(())
            }
        }
    }

    async fn finish(
        &mut self,
        verdict: Result<FinalVerdict, JudgeError>,
    ) -> Result<FinalVerdict, JudgeError> {
        let verdict = match verdict {
            Err(JudgeError::Rejected(rejection)) => {
                log::info!("Submission rejected: {}", rejection);
                let case = TestCase::text(PassState::Fail, self.limits.describe(rejection));
                self.write(&case).await.map(|_| FinalVerdict::new(false))
            }
            other => other,
        };

        match verdict {
            Ok(verdict) => {
                self.transition(DriverState::Done);
                self.write(&verdict).await?;
                Ok(verdict)
            }
            Err(e) => {
                self.abort(&e).await;
                Err(e)
            }
        }
    }

    /// Ends the session with a terminal error line.
    pub async fn abort(&mut self, e: &JudgeError) {
        self.transition(DriverState::Done);
        log::error!("Judge session failed: {}", e);
        let line = FatalError {
            error: e.to_string(),
        };
        if let Err(write_err) = self.write(&line).await {
            log::warn!("Cannot report the failure: {}", write_err);
        }
    }

    async fn write<T: Serialize>(&self, value: &T) -> Result<(), JudgeError> {
        Ok(self.out.lock().await.write_line(value).await?)
    }
}
