use thiserror::Error;

/// Error taxonomy for one streamed chat turn.
///
/// `StreamAborted` is not a failure: the controller converts it into the
/// `Aborted` terminal state and it is never surfaced to the user. The other
/// variants render as displayable strings via `Display`.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Non-success HTTP status before any stream bytes were read.
    /// Carries the server-provided `detail` message.
    #[error("{detail}")]
    RequestFailed { detail: String },

    /// Network or transport failure after streaming began.
    #[error("{0}")]
    StreamFailed(String),

    /// Cooperative cancellation observed while a stream was active.
    #[error("stream aborted")]
    StreamAborted,

    /// A send/regenerate call violated its preconditions. Handled locally by
    /// rejecting the call; never a stream error.
    #[error("{0}")]
    ValidationFailed(String),
}

impl ChatError {
    /// Whether this error ends a turn in the `Aborted` state rather than `Failed`.
    pub fn is_abort(&self) -> bool {
        matches!(self, ChatError::StreamAborted)
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
