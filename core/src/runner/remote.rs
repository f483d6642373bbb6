use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{CodeRunner, RunResponse, RunnerError, SizeLimits};
use crate::protocol::{JsonStream, ProtocolError, RunRequest, SharedWriter};

/// Forwards run requests to a runner on the other end of a pipe pair.
///
/// Requests go out as lines on the shared session writer; responses are read back from `responses`
/// in order. Limits are checked before anything is sent, so an oversized submission never leaves
/// this process.
pub struct RemoteRunner<R, W> {
    out: SharedWriter<W>,
    responses: JsonStream<R>,
    limits: SizeLimits,
}

impl<R, W> RemoteRunner<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: SharedWriter<W>, responses: R) -> Self {
        Self {
            out,
            responses: JsonStream::new(responses),
            limits: SizeLimits::default(),
        }
    }

    pub fn limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[async_trait]
impl<R, W> CodeRunner for RemoteRunner<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn run(&mut self, code: &str, input: Option<&str>) -> Result<RunResponse, RunnerError> {
        if let Err(rejection) = self.limits.check(code, input) {
            log::info!("Not sending run request: {}", rejection);
            return Ok(RunResponse::Rejected(rejection));
        }

        let request = RunRequest {
            code: code.to_owned(),
            input: input.map(str::to_owned),
        };
        self.out.lock().await.write_line(&request).await?;

        match self.responses.next::<RunResponse>().await? {
            Some(response) => Ok(response),
            None => Err(ProtocolError::PipeClosed.into()),
        }
    }
}
