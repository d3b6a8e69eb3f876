//! Mapping from remote job state to the engine's next step.
//!
//! Kept free of any queue type so the scheduling policy can change without
//! touching it.

use zencoder_models::JobState;

/// Terminal outcome reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fetch details and deliver them.
    Finished,
    /// Deliver "Job Failed" without a details fetch.
    Failed,
    /// Deliver "Job Cancelled" without a details fetch.
    Cancelled,
}

/// What happens to a watched job after one progress fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still running; poll again on a later tick.
    Requeue,
    /// Leave the pending set and complete.
    Finalize(Outcome),
}

pub fn classify(state: JobState) -> Transition {
    match state {
        JobState::Pending | JobState::Waiting | JobState::Processing => Transition::Requeue,
        JobState::Finished => Transition::Finalize(Outcome::Finished),
        JobState::Failed => Transition::Finalize(Outcome::Failed),
        JobState::Cancelled => Transition::Finalize(Outcome::Cancelled),
    }
}
