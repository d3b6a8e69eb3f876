//! Job verbs of the Zencoder API.
//!
//! Stateless wrappers: each call shapes one request, sends it through the
//! [`Transport`] and decodes the body.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use zencoder_models::{
    CreateJobResponse, JobDetails, JobId, JobProgress, JobSpec, JobSummary, ListJobsQuery,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{Request, RequestBody, Transport};

/// Details and list entries are wrapped as `{ "job": { ... } }`.
#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: JobDetails,
}

/// Zencoder REST API client.
#[derive(Clone)]
pub struct ZencoderClient {
    transport: Transport,
}

impl ZencoderClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Wrap an existing transport.
    pub fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Underlying transport, for requests without a dedicated verb.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Submit a new job and return its ID.
    pub async fn create_job(&self, spec: &JobSpec) -> ClientResult<JobId> {
        spec.validate().map_err(ClientError::invalid_request)?;

        let request = Request::post("/jobs")
            .named("create_job")
            .body(RequestBody::json(spec)?);

        let created: CreateJobResponse = self.transport.send(request).await?.decode()?;
        info!(job_id = %created.id, outputs = created.outputs.len(), "Created job");
        Ok(created.id)
    }

    /// Fetch the current progress of a job.
    pub async fn get_job_progress(&self, job_id: &JobId) -> ClientResult<JobProgress> {
        let request =
            Request::get(format!("/jobs/{}/progress.json", job_id)).named("get_job_progress");

        let progress: JobProgress = self.transport.send(request).await?.decode()?;
        debug!(job_id = %job_id, state = %progress.state, "Fetched job progress");
        Ok(progress)
    }

    /// Fetch the full job resource.
    pub async fn get_job_details(&self, job_id: &JobId) -> ClientResult<JobDetails> {
        let request = Request::get(format!("/jobs/{}.json", job_id)).named("get_job_details");

        let envelope: JobEnvelope = self.transport.send(request).await?.decode()?;
        Ok(envelope.job)
    }

    /// List jobs with the service's default paging.
    pub async fn list_jobs(&self) -> ClientResult<Vec<JobSummary>> {
        self.list_jobs_with(&ListJobsQuery::default()).await
    }

    /// List jobs with paging and state filters.
    pub async fn list_jobs_with(&self, query: &ListJobsQuery) -> ClientResult<Vec<JobSummary>> {
        let request = query
            .to_pairs()
            .into_iter()
            .fold(Request::get("/jobs").named("list_jobs"), |req, (k, v)| {
                req.query(k, v)
            });

        let entries: Vec<JobEnvelope> = self.transport.send(request).await?.decode()?;
        Ok(entries.into_iter().map(|e| e.job).collect())
    }

    /// Resubmit a failed or cancelled job.
    pub async fn resubmit_job(&self, job_id: &JobId) -> ClientResult<Value> {
        let request =
            Request::put(format!("/jobs/{}/resubmit.json", job_id)).named("resubmit_job");

        let response = self.transport.send(request).await?;
        info!(job_id = %job_id, "Resubmitted job");
        Ok(response.body)
    }

    /// Cancel a job.
    pub async fn cancel_job(&self, job_id: &JobId) -> ClientResult<Value> {
        let request = Request::put(format!("/jobs/{}/cancel.json", job_id)).named("cancel_job");

        let response = self.transport.send(request).await?;
        info!(job_id = %job_id, "Cancelled job");
        Ok(response.body)
    }
}
