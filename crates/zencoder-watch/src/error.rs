//! Watch error types.

use std::time::Duration;

use thiserror::Error;
use zencoder_client::ClientError;
use zencoder_models::JobId;

/// Result type delivered to completions and returned by engine calls.
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors surfaced by the watch engine.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The service reported the job as failed.
    #[error("Job Failed")]
    JobFailed(JobId),

    /// The service reported the job as cancelled.
    #[error("Job Cancelled")]
    JobCancelled(JobId),

    /// Transient failures kept happening until the retry budget ran out.
    #[error("Job {job_id} could not be polled after {attempts} attempts: {source}")]
    PollFailed {
        job_id: JobId,
        attempts: u32,
        #[source]
        source: ClientError,
    },

    /// A failure that retrying cannot fix (4xx, undecodable body, ...).
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Job {job_id} did not reach a terminal state within {elapsed:?}")]
    TimedOut { job_id: JobId, elapsed: Duration },

    #[error("Job {0} is already being watched")]
    AlreadyWatched(JobId),

    /// The engine was dropped before the job completed.
    #[error("Watch engine stopped before the job completed")]
    EngineStopped,
}

impl WatchError {
    /// Human-readable message handed to callers.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Label used for completion metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            WatchError::JobFailed(_) => "failed",
            WatchError::JobCancelled(_) => "cancelled",
            WatchError::TimedOut { .. } => "timed_out",
            WatchError::EngineStopped => "stopped",
            WatchError::PollFailed { .. } | WatchError::Client(_) => "error",
            WatchError::AlreadyWatched(_) => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_messages() {
        assert_eq!(WatchError::JobFailed(JobId::from("1")).message(), "Job Failed");
        assert_eq!(
            WatchError::JobCancelled(JobId::from("1")).message(),
            "Job Cancelled"
        );
    }

    #[test]
    fn test_poll_failed_keeps_source() {
        use std::error::Error as _;

        let err = WatchError::PollFailed {
            job_id: JobId::from("8"),
            attempts: 5,
            source: ClientError::malformed("bad body"),
        };
        assert!(err.message().contains("after 5 attempts"));
        assert!(err.source().is_some());
        assert_eq!(err.outcome_label(), "error");
    }
}
