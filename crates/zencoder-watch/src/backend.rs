//! The slice of the job API the engine depends on.

use async_trait::async_trait;

use zencoder_client::{ClientResult, ZencoderClient};
use zencoder_models::{JobDetails, JobId, JobProgress, JobSpec};

/// Remote operations used by the watch engine.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit a job and return its ID.
    async fn create_job(&self, spec: &JobSpec) -> ClientResult<JobId>;

    /// Current progress of a job.
    async fn get_job_progress(&self, job_id: &JobId) -> ClientResult<JobProgress>;

    /// Full job resource.
    async fn get_job_details(&self, job_id: &JobId) -> ClientResult<JobDetails>;
}

#[async_trait]
impl JobBackend for ZencoderClient {
    async fn create_job(&self, spec: &JobSpec) -> ClientResult<JobId> {
        ZencoderClient::create_job(self, spec).await
    }

    async fn get_job_progress(&self, job_id: &JobId) -> ClientResult<JobProgress> {
        ZencoderClient::get_job_progress(self, job_id).await
    }

    async fn get_job_details(&self, job_id: &JobId) -> ClientResult<JobDetails> {
        ZencoderClient::get_job_details(self, job_id).await
    }
}
