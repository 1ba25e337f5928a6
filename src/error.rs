use thiserror::Error;

/// Faults a stage can surface to the coordinator's retry layer.
///
/// An absent input is deliberately not a fault: a stage that has nothing
/// to work with reports [`StageOutcome::Empty`] instead, which is never
/// retried and never fails the run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("artifact publish failed: {0}")]
    Publish(String),
}

impl From<std::io::Error> for StageError {
    fn from(error: std::io::Error) -> Self {
        StageError::TransientIo(error.to_string())
    }
}

impl From<csv::Error> for StageError {
    fn from(error: csv::Error) -> Self {
        StageError::TransientIo(error.to_string())
    }
}

/// Explicit per-stage result, replacing the catch-log-return-`None` pattern:
/// the coordinator branches on the variant instead of probing sentinel values.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage produced its output.
    Success(T),
    /// Nothing to do (no usable input); carries the logged reason.
    Empty(String),
    /// A retryable fault; surfaced to the retry policy.
    Failed(StageError),
}

impl<T> StageOutcome<T> {
    pub fn empty(reason: impl Into<String>) -> Self {
        StageOutcome::Empty(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StageOutcome::Empty(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}
