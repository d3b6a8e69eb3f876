//! Job resource as returned by the details and listing endpoints.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{JobId, JobState};

/// A job resource.
///
/// The payload schema belongs to the service, so only the identifier and
/// state are typed. The object is kept exactly as received and serializes
/// back to the same JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetails {
    id: JobId,
    raw: Map<String, Value>,
}

/// List entries carry the same job object as the details endpoint.
pub type JobSummary = JobDetails;

impl JobDetails {
    /// Build from a decoded job object.
    pub fn from_object(raw: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let id = raw
            .get("id")
            .cloned()
            .ok_or_else(|| de::Error::missing_field("id"))
            .and_then(JobId::deserialize)?;
        Ok(Self { id, raw })
    }

    /// Job identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Raw state string, if the object has one.
    pub fn state_str(&self) -> Option<&str> {
        self.raw.get("state").and_then(Value::as_str)
    }

    /// State parsed into a [`JobState`], `None` when absent or unknown.
    pub fn state(&self) -> Option<JobState> {
        self.state_str().and_then(|s| s.parse().ok())
    }

    /// Look up any field of the job object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// The job object as received.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.raw)
    }
}

impl Serialize for JobDetails {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JobDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_object(raw).map_err(de::Error::custom)
    }
}

/// Filters for `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListJobsQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Entries per page
    pub per_page: Option<u32>,
    /// Only jobs in this state
    pub state: Option<JobState>,
}

impl ListJobsQuery {
    /// Query-string pairs for the set filters.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        if let Some(state) = self.state {
            pairs.push(("state", state.as_str().to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_preserve_raw_object() {
        let body = json!({
            "id": 1234,
            "state": "finished",
            "input_media_file": { "format": "mpeg4" },
            "output_media_files": [{ "url": "s3://bucket/out.mp4" }]
        });

        let details: JobDetails = serde_json::from_value(body.clone()).unwrap();

        assert_eq!(details.id().as_str(), "1234");
        assert_eq!(details.state(), Some(JobState::Finished));
        assert_eq!(serde_json::to_value(&details).unwrap(), body);
    }

    #[test]
    fn test_details_unknown_state_is_none() {
        let details: JobDetails =
            serde_json::from_value(json!({ "id": "9", "state": "assigning" })).unwrap();
        assert_eq!(details.state_str(), Some("assigning"));
        assert_eq!(details.state(), None);
    }

    #[test]
    fn test_details_require_id() {
        let result = serde_json::from_value::<JobDetails>(json!({ "state": "finished" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_list_query_pairs() {
        let query = ListJobsQuery {
            page: Some(2),
            per_page: None,
            state: Some(JobState::Failed),
        };
        assert_eq!(
            query.to_pairs(),
            vec![("page", "2".to_string()), ("state", "failed".to_string())]
        );
        assert!(ListJobsQuery::default().to_pairs().is_empty());
    }
}
