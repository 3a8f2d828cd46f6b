//! In-memory job registry with validated transitions.

use quire_types::{JobId, JobRecord, JobRole, JobState, RegistryError, SubmitError, Transition};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Consumer end of the dispatch queue.
///
/// Handed out once by [`JobRegistry::take_dispatch_rx`] and owned by the
/// worker pool. Receiving a job id also decrements the registry's
/// queue-depth counter.
#[derive(Debug)]
pub struct DispatchReceiver {
    rx: UnboundedReceiver<JobId>,
    depth: Arc<AtomicUsize>,
}

impl DispatchReceiver {
    /// Waits for the next dispatched job id.
    ///
    /// Returns `None` once the registry has been dropped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<JobId> {
        let id = self.rx.recv().await;
        if id.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        id
    }
}

/// Thread-safe map of job id to record, plus the dispatch queue.
///
/// The map is guarded by one coarse lock; mutation frequency is low
/// relative to read/poll frequency, so contention is not a concern. All
/// reads return cloned snapshots, so no lock is ever held while a caller
/// inspects a record.
///
/// The dispatch queue is unbounded: submission never blocks the submitter.
/// Queue depth is exposed for observability only.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    dispatch_tx: UnboundedSender<JobId>,
    dispatch_rx: Mutex<Option<DispatchReceiver>>,
    depth: Arc<AtomicUsize>,
}

impl JobRegistry {
    /// Creates an empty registry with a fresh dispatch queue.
    #[must_use]
    pub fn new() -> Self {
        let (dispatch_tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        Self {
            jobs: Mutex::new(HashMap::new()),
            dispatch_tx,
            dispatch_rx: Mutex::new(Some(DispatchReceiver {
                rx,
                depth: Arc::clone(&depth),
            })),
            depth,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        // Record mutation cannot panic, so a poisoned lock still holds a
        // consistent map.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the consumer end of the dispatch queue.
    ///
    /// Returns `None` if it was already taken; there is exactly one
    /// consumer (the worker pool).
    #[must_use]
    pub fn take_dispatch_rx(&self) -> Option<DispatchReceiver> {
        self.dispatch_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Submits a job: tracks the record and enqueues its id for dispatch.
    ///
    /// Submission is fire-and-forget and never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::DuplicateJob`] if a record with this id is
    /// already tracked; the existing record is untouched.
    pub fn submit(&self, record: JobRecord) -> Result<JobId, SubmitError> {
        let id = self.track(record)?;
        self.depth.fetch_add(1, Ordering::Relaxed);
        if self.dispatch_tx.send(id).is_err() {
            // No pool is draining the queue; the job stays Queued.
            self.depth.fetch_sub(1, Ordering::Relaxed);
            warn!(job = %id, "dispatch queue has no consumer; job will not run");
        }
        debug!(job = %id, depth = self.queue_depth(), "job enqueued");
        Ok(id)
    }

    /// Tracks a record without enqueueing it for dispatch.
    ///
    /// Used for master records, which are consolidated by the batch
    /// coordinator rather than executed by a worker.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::DuplicateJob`] if a record with this id is
    /// already tracked.
    pub fn track(&self, record: JobRecord) -> Result<JobId, SubmitError> {
        let id = record.id;
        let mut jobs = self.lock();
        if jobs.contains_key(&id) {
            return Err(SubmitError::DuplicateJob(id));
        }
        jobs.insert(id, record);
        Ok(id)
    }

    /// Returns a snapshot of the record, or `None` if the id is unknown.
    #[must_use]
    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.lock().get(&id).cloned()
    }

    /// Returns snapshots of all sub-jobs of a batch, ordered by page-range
    /// start.
    #[must_use]
    pub fn list_by_batch(&self, batch_id: JobId) -> Vec<JobRecord> {
        let mut subs: Vec<JobRecord> = self
            .lock()
            .values()
            .filter(|j| j.role == JobRole::Sub && j.batch_id == Some(batch_id))
            .cloned()
            .collect();
        subs.sort_by_key(|j| j.page_range.map_or(u32::MAX, |r| r.start));
        subs
    }

    /// Applies a state transition under the registry lock.
    ///
    /// Returns a snapshot of the record after the change.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown id, or
    /// [`RegistryError::IllegalTransition`] if the change violates the
    /// monotonic transition set; in both cases nothing is mutated.
    pub fn apply(&self, id: JobId, transition: Transition) -> Result<JobRecord, RegistryError> {
        let mut jobs = self.lock();
        let record = jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

        let legal = match &transition {
            Transition::Start => record.state.can_transition_to(JobState::Processing),
            // Progress updates only ever come from the worker that owns
            // the job, while it is processing.
            Transition::Progress { .. } => record.state == JobState::Processing,
            Transition::Complete { .. } => record.state.can_transition_to(JobState::Completed),
            Transition::Fail { .. } => record.state.can_transition_to(JobState::Failed),
        };
        if !legal {
            return Err(RegistryError::IllegalTransition {
                id,
                from: record.state,
                to: transition.target_state(),
            });
        }

        record.apply(transition);
        Ok(record.clone())
    }

    /// Returns the number of ids waiting on the dispatch queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Returns the number of jobs currently in the `Processing` state.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|j| j.state == JobState::Processing)
            .count()
    }

    /// Returns the total number of tracked records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no records are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes terminal records whose terminal-state age exceeds the
    /// window. Non-terminal records are never removed.
    ///
    /// Intended to be called periodically by an external scheduler to
    /// bound registry memory growth. Returns the number of records
    /// removed.
    pub fn sweep_finished(&self, older_than: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - older_than;
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, j| !(j.is_terminal() && j.finished_at.is_some_and(|t| t < cutoff)));
        let removed = before - jobs.len();
        if removed > 0 {
            info!(removed, "swept finished jobs");
        }
        removed
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
