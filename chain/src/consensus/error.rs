use thiserror::Error;

use crate::queue::QueueError;

/// Errors that end the validation loop.
///
/// Per-transaction failures never show up here; they only reject the
/// transaction at hand.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The queue stayed unreachable for more consecutive attempts than
    /// the configured limit.
    #[error("work queue unavailable after {attempts} consecutive attempts: {last_error}")]
    QueueUnavailable {
        attempts: u32,
        #[source]
        last_error: QueueError,
    },
}
