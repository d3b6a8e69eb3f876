//! Watch engine metrics.

use metrics::{counter, gauge};

/// Metric name constants for consistency.
pub mod names {
    /// Progress fetches issued.
    pub const POLLS_TOTAL: &str = "zencoder_watch_polls_total";

    /// Jobs put back in the queue for a later tick.
    pub const REQUEUES_TOTAL: &str = "zencoder_watch_requeues_total";

    /// Failed progress or details fetches by retryability.
    pub const POLL_ERRORS_TOTAL: &str = "zencoder_watch_poll_errors_total";

    /// Completions delivered by outcome.
    pub const COMPLETED_TOTAL: &str = "zencoder_watch_completed_total";

    /// Jobs currently tracked (queued or in flight).
    pub const WATCHED_JOBS: &str = "zencoder_watch_jobs";
}

pub fn record_poll() {
    counter!(names::POLLS_TOTAL).increment(1);
}

pub fn record_requeue() {
    counter!(names::REQUEUES_TOTAL).increment(1);
}

pub fn record_poll_error(retryable: bool) {
    counter!(
        names::POLL_ERRORS_TOTAL,
        "retryable" => retryable.to_string()
    )
    .increment(1);
}

pub fn record_completion(outcome: &'static str) {
    counter!(names::COMPLETED_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_watched_jobs(count: usize) {
    gauge!(names::WATCHED_JOBS).set(count as f64);
}
