// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Two families of errors:
//
//   CollaboratorError — one external call failed. Always
//                       recovered locally by the fallback policy
//                       (application::fallback); never crashes
//                       the run.
//   PipelineError     — the run itself could not finish. The only
//                       variant is BudgetExceeded, which carries
//                       the last good RunState.
//
// `guarded` puts a deadline on any collaborator call; an elapsed
// deadline is reported as CollaboratorError::Timeout.

use std::future::Future;
use std::time::Duration;

use crate::domain::state::RunState;

/// Failure of a single call to an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("could not parse judgment: {reason}")]
    JudgmentParse { reason: String },

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl CollaboratorError {
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable { reason: reason.into() }
    }

    pub fn judgment_parse(reason: impl Into<String>) -> Self {
        Self::JudgmentParse { reason: reason.into() }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport { reason: reason.into() }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse { reason: reason.into() }
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Await `fut`, turning an elapsed timeout into `CollaboratorError::Timeout`.
pub async fn guarded<T, F>(timeout: Duration, fut: F) -> CollaboratorResult<T>
where
    F: Future<Output = CollaboratorResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_)     => Err(CollaboratorError::Timeout(timeout)),
    }
}

/// Failure of the pipeline as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("step budget of {budget} stage invocations exceeded")]
    BudgetExceeded {
        budget: u32,
        /// Best-effort state as of the last completed stage
        state: Box<RunState>,
    },
}

impl PipelineError {
    /// The state the run had reached before it was halted.
    pub fn into_state(self) -> RunState {
        match self {
            PipelineError::BudgetExceeded { state, .. } => *state,
        }
    }
}
