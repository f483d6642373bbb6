pub mod driver;
pub mod program;

pub use driver::*;
pub use program::*;

use async_trait::async_trait;

use crate::context::Context;
use crate::protocol::ProtocolError;
use crate::runner::{RunRejection, RunnerError};
use crate::verdict::FinalVerdict;

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("Failed to load judge program: {0}")]
    Load(#[from] LoadError),

    #[error("Submission rejected: {0}")]
    Rejected(RunRejection),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Judge driver stopped before the judge program finished")]
    ChannelClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A judge program: drives runs of the submission through `ctx` and decides the verdict.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, ctx: &mut Context) -> Result<FinalVerdict, JudgeError>;
}
