//! Job watch engine.
//!
//! Turns "submit and forget" into "exactly one terminal result per job":
//! - Jobs wait in a [`PendingSet`] until a tick takes them
//! - Each tick takes a bounded batch and polls it concurrently
//! - Non-terminal jobs go back to the queue, terminal ones are removed and
//!   completed
//! - Transient fetch failures are retried on later ticks up to
//!   `max_poll_failures`, anything else is reported right away. A 429 with
//!   `Retry-After` keeps the job out of ticks until the delay has passed
//! - A cancelled tick returns its jobs to the queue
//! - Dropping the last engine clone completes every watched job with
//!   [`WatchError::EngineStopped`]
//!
//! The timer only spawns ticks, so a slow request never delays the next one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::{oneshot, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

use zencoder_client::{ClientError, ZencoderClient};
use zencoder_models::{JobDetails, JobId, JobSpec};

use crate::backend::JobBackend;
use crate::classify::{classify, Outcome, Transition};
use crate::config::WatchConfig;
use crate::error::{WatchError, WatchResult};
use crate::handle::WatchHandle;
use crate::metrics::{
    record_completion, record_poll, record_poll_error, record_requeue, set_watched_jobs,
};
use crate::pending::{Completion, PendingSet, WatchedJob};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Jobs taken from the queue
    pub polled: usize,
    /// Jobs put back for a later tick
    pub requeued: usize,
    /// Jobs whose completion fired
    pub completed: usize,
}

enum Step {
    Requeued,
    Completed,
    /// The job was no longer in flight
    Skipped,
}

/// A job taken from the queue for one tick.
///
/// Dropped while still armed (a cancelled tick), it puts the job back in the
/// queue. Disarm it once the job has been requeued or released: another tick
/// may own the ID by then.
struct InFlight<'a> {
    pending: &'a Mutex<PendingSet>,
    job_id: JobId,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed && lock(self.pending).requeue(&self.job_id) {
            debug!(job_id = %self.job_id, "Poll abandoned, job returned to queue");
        }
    }
}

struct EngineInner {
    backend: Arc<dyn JobBackend>,
    config: WatchConfig,
    pending: Mutex<PendingSet>,
    permits: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let jobs = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain();
        if jobs.is_empty() {
            return;
        }

        info!(jobs = jobs.len(), "Watch engine dropped with jobs still watched");
        set_watched_jobs(0);
        for WatchedJob { id, completion, .. } in jobs {
            record_completion("stopped");
            completion.deliver(&id, Err(WatchError::EngineStopped));
        }
    }
}

/// Polling scheduler for watched jobs.
///
/// Cheap to clone; clones share the same pending set.
#[derive(Clone)]
pub struct WatchEngine {
    inner: Arc<EngineInner>,
}

impl WatchEngine {
    /// Create a stopped engine. Call [`start`](Self::start) to begin ticking.
    pub fn new(backend: Arc<dyn JobBackend>, config: WatchConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));

        Self {
            inner: Arc::new(EngineInner {
                backend,
                config,
                pending: Mutex::new(PendingSet::new()),
                permits,
                shutdown,
                timer: Mutex::new(None),
            }),
        }
    }

    /// Create an engine polling through a [`ZencoderClient`].
    pub fn with_client(client: ZencoderClient, config: WatchConfig) -> Self {
        Self::new(Arc::new(client), config)
    }

    pub fn config(&self) -> &WatchConfig {
        &self.inner.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Watch a job and call `on_complete` with its terminal result.
    ///
    /// Returns immediately. The callback runs later on an engine task, never
    /// inside this call.
    pub fn watch<F>(&self, job_id: JobId, on_complete: F) -> WatchResult<()>
    where
        F: FnOnce(WatchResult<JobDetails>) + Send + 'static,
    {
        self.register(job_id, Completion::callback(on_complete))
    }

    /// Watch a job and get a future for its terminal result.
    pub fn watch_handle(&self, job_id: JobId) -> WatchResult<WatchHandle> {
        let (tx, rx) = oneshot::channel();
        self.register(job_id.clone(), Completion::Channel(tx))?;
        Ok(WatchHandle::new(job_id, rx))
    }

    /// Submit a job and watch it.
    ///
    /// A submission failure is returned here and nothing is registered.
    pub async fn create_job<F>(&self, spec: &JobSpec, on_complete: F) -> WatchResult<JobId>
    where
        F: FnOnce(WatchResult<JobDetails>) + Send + 'static,
    {
        let job_id = self.inner.backend.create_job(spec).await?;
        self.watch(job_id.clone(), on_complete)?;
        Ok(job_id)
    }

    /// Submit a job and get a future for its terminal result.
    pub async fn create_job_handle(&self, spec: &JobSpec) -> WatchResult<WatchHandle> {
        let job_id = self.inner.backend.create_job(spec).await?;
        self.watch_handle(job_id)
    }

    fn register(&self, job_id: JobId, completion: Completion) -> WatchResult<()> {
        let mut pending = self.lock_pending();

        if let Err(rejected) = pending.insert(WatchedJob::new(job_id.clone(), completion)) {
            warn!(job_id = %rejected.id, "Job is already being watched");
            return Err(WatchError::AlreadyWatched(job_id));
        }

        set_watched_jobs(pending.tracked_len());
        info!(job_id = %job_id, queued = pending.queued_len(), "Watching job");
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the recurring timer. No-op if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = lock(&self.inner.timer);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.inner.shutdown.send_replace(false);
        let shutdown_rx = self.inner.shutdown.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.tick_interval;

        info!(interval = ?period, "Starting job watch timer");
        *timer = Some(tokio::spawn(run_timer(weak, period, shutdown_rx)));
    }

    /// Stop the timer and wait for it to exit.
    ///
    /// Ticks already running finish normally. Watched jobs stay queued and
    /// resume on the next [`start`](Self::start).
    pub async fn stop(&self) {
        self.inner.shutdown.send_replace(true);
        let handle = lock(&self.inner.timer).take();

        if let Some(handle) = handle {
            let _ = handle.await;
            info!(
                pending = self.pending_count(),
                "Job watch timer stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.timer)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Jobs waiting for a tick.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().queued_len()
    }

    /// Jobs currently being polled.
    pub fn in_flight_count(&self) -> usize {
        self.lock_pending().in_flight_len()
    }

    pub fn is_watching(&self, job_id: &JobId) -> bool {
        self.lock_pending().contains(job_id)
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Run one scheduling step and wait for the polled jobs to settle.
    pub async fn tick(&self) -> TickSummary {
        let batch = self.take_batch();
        if batch.is_empty() {
            return TickSummary::default();
        }

        let polled = batch.len();
        let steps = join_all(
            batch
                .into_iter()
                .map(|(job, permit)| self.process(job, permit)),
        )
        .await;

        let mut summary = TickSummary {
            polled,
            ..TickSummary::default()
        };
        for step in steps {
            match step {
                Step::Requeued => summary.requeued += 1,
                Step::Completed => summary.completed += 1,
                Step::Skipped => {}
            }
        }

        debug!(
            polled = summary.polled,
            requeued = summary.requeued,
            completed = summary.completed,
            "Tick finished"
        );
        summary
    }

    /// Take up to `max_jobs_per_tick` due jobs, each holding an in-flight permit.
    fn take_batch(&self) -> Vec<(InFlight<'_>, OwnedSemaphorePermit)> {
        let mut pending = self.lock_pending();
        let now = Instant::now();
        let mut batch = Vec::new();

        while batch.len() < self.inner.config.max_jobs_per_tick.max(1) {
            if pending.queued_len() == 0 {
                break;
            }
            let Ok(permit) = Arc::clone(&self.inner.permits).try_acquire_owned() else {
                debug!("In-flight limit reached, deferring remaining jobs");
                break;
            };
            match pending.take_due(now) {
                Some(job_id) => batch.push((
                    InFlight {
                        pending: &self.inner.pending,
                        job_id,
                        armed: true,
                    },
                    permit,
                )),
                None => break,
            }
        }

        batch
    }

    async fn process(&self, mut job: InFlight<'_>, permit: OwnedSemaphorePermit) -> Step {
        let span = info_span!("watch_poll", job_id = %job.job_id);
        let step = self.poll_job(&job.job_id).instrument(span).await;
        job.disarm();
        drop(permit);
        step
    }

    async fn poll_job(&self, job_id: &JobId) -> Step {
        let Some(registered_at) = self.with_in_flight(job_id, |job| job.registered_at) else {
            return Step::Skipped;
        };

        if let Some(limit) = self.inner.config.max_watch_duration {
            let elapsed = registered_at.elapsed();
            if elapsed >= limit {
                warn!(job_id = %job_id, elapsed = ?elapsed, "Giving up on job");
                let err = WatchError::TimedOut {
                    job_id: job_id.clone(),
                    elapsed,
                };
                return self.finalize(job_id, Err(err));
            }
        }

        self.with_in_flight(job_id, |job| job.polls += 1);
        record_poll();

        let progress = match self.inner.backend.get_job_progress(job_id).await {
            Ok(progress) => progress,
            Err(e) => return self.handle_failure(job_id, e),
        };

        match classify(progress.state) {
            Transition::Requeue => {
                self.with_in_flight(job_id, |job| job.consecutive_failures = 0);
                debug!(
                    job_id = %job_id,
                    state = %progress.state,
                    progress = ?progress.progress,
                    "Job still running"
                );
                self.requeue(job_id)
            }
            Transition::Finalize(Outcome::Finished) => {
                // Still in flight, so no other tick can poll it meanwhile.
                match self.inner.backend.get_job_details(job_id).await {
                    Ok(details) => self.finalize(job_id, Ok(details)),
                    Err(e) => self.handle_failure(job_id, e),
                }
            }
            Transition::Finalize(Outcome::Failed) => {
                self.finalize(job_id, Err(WatchError::JobFailed(job_id.clone())))
            }
            Transition::Finalize(Outcome::Cancelled) => {
                self.finalize(job_id, Err(WatchError::JobCancelled(job_id.clone())))
            }
        }
    }

    fn handle_failure(&self, job_id: &JobId, err: ClientError) -> Step {
        let retryable = err.is_retryable();
        record_poll_error(retryable);

        if !retryable {
            warn!(job_id = %job_id, "Job poll failed permanently: {}", err);
            return self.finalize(job_id, Err(WatchError::Client(err)));
        }

        let retry_after = err.retry_after_ms().map(Duration::from_millis);
        let Some(attempts) = self.with_in_flight(job_id, |job| {
            job.consecutive_failures += 1;
            job.not_before = retry_after.map(|delay| Instant::now() + delay);
            job.consecutive_failures
        }) else {
            return Step::Skipped;
        };

        if attempts >= self.inner.config.max_poll_failures.max(1) {
            warn!(
                job_id = %job_id,
                attempts,
                "Job poll failed too many times: {}", err
            );
            return self.finalize(
                job_id,
                Err(WatchError::PollFailed {
                    job_id: job_id.clone(),
                    attempts,
                    source: err,
                }),
            );
        }

        warn!(
            job_id = %job_id,
            attempt = attempts,
            retry_after = ?retry_after,
            "Job poll failed, retrying later: {}", err
        );
        self.requeue(job_id)
    }

    fn requeue(&self, job_id: &JobId) -> Step {
        if !self.lock_pending().requeue(job_id) {
            return Step::Skipped;
        }
        record_requeue();
        Step::Requeued
    }

    /// Remove the job, then fire its completion.
    fn finalize(&self, job_id: &JobId, result: WatchResult<JobDetails>) -> Step {
        let job = {
            let mut pending = self.lock_pending();
            let job = pending.release(job_id);
            set_watched_jobs(pending.tracked_len());
            job
        };
        let Some(WatchedJob {
            id,
            completion,
            polls,
            ..
        }) = job
        else {
            return Step::Skipped;
        };

        let outcome = match &result {
            Ok(_) => "finished",
            Err(e) => e.outcome_label(),
        };
        record_completion(outcome);
        info!(job_id = %id, outcome, polls, "Job completed");

        completion.deliver(&id, result);
        Step::Completed
    }

    fn with_in_flight<R>(&self, job_id: &JobId, f: impl FnOnce(&mut WatchedJob) -> R) -> Option<R> {
        self.lock_pending().in_flight_mut(job_id).map(f)
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingSet> {
        lock(&self.inner.pending)
    }
}

/// Lock a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_timer(
    inner: Weak<EngineInner>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let engine = WatchEngine { inner };
                tokio::spawn(async move {
                    engine.tick().await;
                });
            }
        }
    }

    debug!("Job watch timer exited");
}
