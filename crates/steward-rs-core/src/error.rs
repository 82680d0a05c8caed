use crate::types::{SessionId, TurnId};
use thiserror::Error;

/// Turn-level failures. Tool failures never appear here; they are tool results.
#[derive(Debug, Error)]
pub enum StewardCoreError {
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    /// The chat model call failed; the turn was rolled back.
    #[error("model error: {0}")]
    Model(String),
    /// Cancelled between transitions; recorded checkpoints are kept.
    #[error("turn cancelled: {0}")]
    Cancelled(TurnId),
    /// The checkpoint store could not be read or written.
    #[error("state error: {0}")]
    State(String),
    /// The spawned turn task panicked or was aborted.
    #[error("executor error: {0}")]
    Executor(String),
}
