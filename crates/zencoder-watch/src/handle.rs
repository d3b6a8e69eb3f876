//! Future resolving to a watched job's result.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use zencoder_models::{JobDetails, JobId};

use crate::error::{WatchError, WatchResult};

/// Resolves once the engine completes the job.
///
/// Resolves to [`WatchError::EngineStopped`] if the engine is dropped first.
#[derive(Debug)]
pub struct WatchHandle {
    job_id: JobId,
    rx: oneshot::Receiver<WatchResult<JobDetails>>,
}

impl WatchHandle {
    pub(crate) fn new(job_id: JobId, rx: oneshot::Receiver<WatchResult<JobDetails>>) -> Self {
        Self { job_id, rx }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl Future for WatchHandle {
    type Output = WatchResult<JobDetails>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(WatchError::EngineStopped)))
    }
}
