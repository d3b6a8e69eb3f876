//! Shared data models for the Zencoder job client.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers and remote job states
//! - Job submission payloads
//! - Progress, details and listing responses

pub mod details;
pub mod job;
pub mod progress;

// Re-export common types
pub use details::{JobDetails, JobSummary, ListJobsQuery};
pub use job::{CreateJobResponse, JobId, JobSpec, JobState, ParseJobStateError};
pub use progress::JobProgress;
