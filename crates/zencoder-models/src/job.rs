//! Job identifiers, remote states and submission payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Identifier assigned to a job by the remote service.
///
/// The service emits numeric IDs; both JSON numbers and strings are
/// accepted and the ID is always kept as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for JobId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Ok(Self(s)),
            RawId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

/// Job state as reported by the progress endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted but not yet scheduled
    Pending,
    /// Waiting for an encoder
    Waiting,
    /// Being encoded
    Processing,
    /// All outputs completed
    Finished,
    /// Encoding failed
    Failed,
    /// Cancelled through the API
    Cancelled,
}

impl JobState {
    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Waiting => "waiting",
            JobState::Processing => "processing",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string is not a known job state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job state: {0}")]
pub struct ParseJobStateError(pub String);

/// Accepts exactly the wire names, the same set serde accepts.
impl FromStr for JobState {
    type Err = ParseJobStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "waiting" => Ok(JobState::Waiting),
            "processing" => Ok(JobState::Processing),
            "finished" => Ok(JobState::Finished),
            "failed" => Ok(JobState::Failed),
            "cancelled" => Ok(JobState::Cancelled),
            other => Err(ParseJobStateError(other.to_string())),
        }
    }
}

/// Payload submitted to create a job.
///
/// Only `input` is interpreted locally; outputs and any other top-level
/// settings are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Source media URL
    pub input: String,
    /// Output definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Value>,
    /// Remaining job settings (notifications, region, test flag, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobSpec {
    /// Create a spec for the given input with no explicit outputs.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            outputs: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Add an output definition.
    pub fn with_output(mut self, output: Value) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set an arbitrary top-level setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Reject specs that the service would refuse outright.
    pub fn validate(&self) -> Result<(), String> {
        if self.input.trim().is_empty() {
            return Err("job input must not be empty".to_string());
        }
        Ok(())
    }
}

/// Body returned by `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    /// Identifier of the new job
    pub id: JobId,
    /// Output stubs (ids and destination urls)
    #[serde(default)]
    pub outputs: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_accepts_number_and_string() {
        let numeric: JobId = serde_json::from_value(json!(1234)).unwrap();
        let text: JobId = serde_json::from_value(json!("1234")).unwrap();
        assert_eq!(numeric, text);
        assert_eq!(numeric.as_str(), "1234");
    }

    #[test]
    fn test_job_id_serializes_as_string() {
        let id = JobId::from(42u64);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("42"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Waiting.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Finished.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[test]
    fn test_state_wire_format() {
        let state: JobState = serde_json::from_value(json!("cancelled")).unwrap();
        assert_eq!(state, JobState::Cancelled);
        assert!(serde_json::from_value::<JobState>(json!("exploded")).is_err());
    }

    #[test]
    fn test_state_from_str() {
        assert_eq!("processing".parse::<JobState>(), Ok(JobState::Processing));
        assert_eq!(
            "queued".parse::<JobState>(),
            Err(ParseJobStateError("queued".to_string()))
        );
    }

    #[test]
    fn test_state_parsing_matches_wire_format() {
        for raw in ["Finished", " finished", "CANCELLED"] {
            assert!(raw.parse::<JobState>().is_err());
            assert!(serde_json::from_value::<JobState>(json!(raw)).is_err());
        }
        for state in [JobState::Pending, JobState::Finished, JobState::Cancelled] {
            assert_eq!(state.as_str().parse::<JobState>(), Ok(state));
            assert_eq!(serde_json::from_value::<JobState>(json!(state.as_str())).unwrap(), state);
        }
    }

    #[test]
    fn test_spec_keeps_extra_settings() {
        let spec = JobSpec::new("s3://bucket/in.mov")
            .with_output(json!({ "label": "web" }))
            .with_setting("test", json!(true));

        let body = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            body,
            json!({
                "input": "s3://bucket/in.mov",
                "outputs": [{ "label": "web" }],
                "test": true
            })
        );
    }

    #[test]
    fn test_spec_validation() {
        assert!(JobSpec::new("https://example.com/a.mp4").validate().is_ok());
        assert!(JobSpec::new("   ").validate().is_err());
    }
}
