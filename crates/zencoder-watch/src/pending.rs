//! Pending set: the queue of watched jobs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, error};

use zencoder_models::{JobDetails, JobId};

use crate::error::WatchResult;

/// Boxed completion callback.
pub type CompletionFn = Box<dyn FnOnce(WatchResult<JobDetails>) + Send + 'static>;

/// Where a job's single result goes.
pub enum Completion {
    Callback(CompletionFn),
    Channel(oneshot::Sender<WatchResult<JobDetails>>),
}

impl Completion {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(WatchResult<JobDetails>) + Send + 'static,
    {
        Completion::Callback(Box::new(f))
    }

    /// Hand over the result. Consumes the completion, so it runs at most once.
    pub fn deliver(self, job_id: &JobId, result: WatchResult<JobDetails>) {
        match self {
            Completion::Callback(f) => {
                // A panicking callback must not take the rest of the tick down with it.
                if catch_unwind(AssertUnwindSafe(move || f(result))).is_err() {
                    error!(job_id = %job_id, "Completion callback panicked");
                }
            }
            Completion::Channel(tx) => {
                if tx.send(result).is_err() {
                    debug!(job_id = %job_id, "Watch handle dropped before completion");
                }
            }
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Callback(_) => f.write_str("Completion::Callback"),
            Completion::Channel(_) => f.write_str("Completion::Channel"),
        }
    }
}

/// A registration waiting for its terminal state.
#[derive(Debug)]
pub struct WatchedJob {
    pub id: JobId,
    pub completion: Completion,
    /// Transient failures in a row
    pub consecutive_failures: u32,
    /// Progress fetches issued so far
    pub polls: u32,
    pub registered_at: Instant,
    /// Skipped by ticks until this instant (set from `Retry-After`)
    pub not_before: Option<Instant>,
}

impl WatchedJob {
    pub fn new(id: JobId, completion: Completion) -> Self {
        Self {
            id,
            completion,
            consecutive_failures: 0,
            polls: 0,
            registered_at: Instant::now(),
            not_before: None,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        self.not_before.map_or(true, |at| now >= at)
    }
}

/// Watched jobs, queued or being polled.
///
/// A job taken with [`take_due`](Self::take_due) moves to the in-flight map
/// and stays there until it is [`requeue`](Self::requeue)d or
/// [`release`](Self::release)d. Its ID cannot be registered a second time in
/// the meantime.
#[derive(Debug, Default)]
pub struct PendingSet {
    queue: VecDeque<WatchedJob>,
    in_flight: HashMap<JobId, WatchedJob>,
    tracked: HashSet<JobId>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Gives the job back if its ID is already tracked.
    pub fn insert(&mut self, job: WatchedJob) -> Result<(), WatchedJob> {
        if !self.tracked.insert(job.id.clone()) {
            return Err(job);
        }
        self.queue.push_back(job);
        Ok(())
    }

    /// Move the first due job to the in-flight map and return its ID.
    ///
    /// Jobs still backing off are rotated to the back of the queue.
    pub fn take_due(&mut self, now: Instant) -> Option<JobId> {
        for _ in 0..self.queue.len() {
            let mut job = self.queue.pop_front()?;
            if !job.is_due(now) {
                self.queue.push_back(job);
                continue;
            }
            job.not_before = None;
            let id = job.id.clone();
            self.in_flight.insert(id.clone(), job);
            return Some(id);
        }
        None
    }

    /// Bookkeeping access to an in-flight job.
    pub fn in_flight_mut(&mut self, job_id: &JobId) -> Option<&mut WatchedJob> {
        self.in_flight.get_mut(job_id)
    }

    /// Put an in-flight job back at the end of the queue.
    ///
    /// Returns `false` if the job was not in flight.
    pub fn requeue(&mut self, job_id: &JobId) -> bool {
        match self.in_flight.remove(job_id) {
            Some(job) => {
                self.queue.push_back(job);
                true
            }
            None => false,
        }
    }

    /// Remove an in-flight job that is about to complete.
    pub fn release(&mut self, job_id: &JobId) -> Option<WatchedJob> {
        let job = self.in_flight.remove(job_id)?;
        self.tracked.remove(job_id);
        Some(job)
    }

    /// Remove every job, queued and in flight.
    pub fn drain(&mut self) -> Vec<WatchedJob> {
        self.tracked.clear();
        let mut jobs: Vec<WatchedJob> = self.queue.drain(..).collect();
        jobs.extend(self.in_flight.drain().map(|(_, job)| job));
        jobs
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.tracked.contains(job_id)
    }

    /// Jobs waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Jobs taken from the queue and not yet requeued or released.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Every job the engine still owns.
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
