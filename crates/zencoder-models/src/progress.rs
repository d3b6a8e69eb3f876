//! Progress endpoint response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::JobState;

/// Body returned by `GET /jobs/{id}/progress.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Current job state
    pub state: JobState,
    /// Overall completion percentage, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Current processing step (e.g. "Transcoding")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_event: Option<String>,
    /// Per-input and per-output progress blocks
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobProgress {
    /// Create a progress report carrying only a state.
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            progress: None,
            current_event: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_decodes_service_body() {
        let progress: JobProgress = serde_json::from_value(json!({
            "state": "processing",
            "progress": 32.34567345,
            "input": { "id": 1234, "state": "finished" },
            "outputs": [{ "id": 4321, "state": "processing", "current_event": "Transcoding" }]
        }))
        .unwrap();

        assert_eq!(progress.state, JobState::Processing);
        assert_eq!(progress.progress, Some(32.34567345));
        assert!(progress.current_event.is_none());
        assert!(progress.extra.contains_key("outputs"));
    }

    #[test]
    fn test_progress_requires_state() {
        let result = serde_json::from_value::<JobProgress>(json!({ "progress": 10.0 }));
        assert!(result.is_err());
    }
}
