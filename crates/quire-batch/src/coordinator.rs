//! Fan-out/fan-in coordination.

use crate::{SplitConfig, Submission, WorkSpec};
use futures::FutureExt;
use quire_pool::{ExecOutput, Executor};
use quire_registry::JobRegistry;
use quire_types::{JobId, JobRecord, JobRole, JobState, SubmitError, Transition, partition};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Splits oversized work into page-range sub-jobs and consolidates each
/// batch exactly once.
///
/// The coordinator makes the split decision at submission time: work at or
/// under the threshold becomes one standalone job, anything larger becomes
/// up to `max_parts` sub-jobs sharing a fresh batch id, plus a master
/// record that is tracked but never dispatched.
///
/// Fan-in is driven by the worker pool's completion channel. The
/// coordinator drains terminal snapshots on its own task and keeps a
/// per-batch countdown; the sibling that brings the countdown to zero
/// removes the batch entry in the same critical section, so consolidation
/// runs exactly once no matter how sibling completions race.
pub struct BatchCoordinator {
    registry: Arc<JobRegistry>,
    executor: Arc<dyn Executor>,
    config: SplitConfig,
    pending: Mutex<HashMap<JobId, usize>>,
    completions_tx: UnboundedSender<JobRecord>,
}

impl BatchCoordinator {
    /// Creates a coordinator and spawns its completion-draining task.
    ///
    /// Wire the coordinator to a pool by passing
    /// [`completions`](Self::completions) to
    /// [`WorkerPool::start_with_completions`].
    ///
    /// [`WorkerPool::start_with_completions`]: quire_pool::WorkerPool::start_with_completions
    #[must_use]
    pub fn new(
        registry: Arc<JobRegistry>,
        executor: Arc<dyn Executor>,
        config: SplitConfig,
    ) -> Arc<Self> {
        let (completions_tx, mut rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self {
            registry,
            executor,
            config,
            pending: Mutex::new(HashMap::new()),
            completions_tx,
        });

        let drain = Arc::clone(&coordinator);
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                drain.on_terminal(record).await;
            }
        });
        coordinator
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<JobId, usize>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the sender the worker pool should report terminal jobs to.
    #[must_use]
    pub fn completions(&self) -> UnboundedSender<JobRecord> {
        self.completions_tx.clone()
    }

    /// Returns the number of batches still waiting for sub-jobs to finish.
    #[must_use]
    pub fn pending_batches(&self) -> usize {
        self.lock_pending().len()
    }

    /// Submits work, splitting it if the unit-count hint exceeds the
    /// threshold.
    ///
    /// A split submission enqueues one sub-job per page range and tracks a
    /// master record whose id doubles as the batch id. The countdown entry
    /// is registered before any sub-job is enqueued, so a fast completion
    /// can never miss it.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::DuplicateJob`] if a generated id collides
    /// with a tracked record; nothing from this submission is left behind.
    pub fn submit(&self, spec: WorkSpec) -> Result<Submission, SubmitError> {
        let units = match spec.total_units {
            Some(units) if units > self.config.split_threshold => units,
            _ => {
                let mut record =
                    JobRecord::standalone(spec.content_ref).with_metadata(spec.metadata);
                if let Some(message) = spec.message {
                    record.message = message;
                }
                let id = self.registry.submit(record)?;
                debug!(job = %id, "standalone submission");
                return Ok(Submission::Standalone(id));
            }
        };

        let batch_id = Uuid::new_v4();
        let ranges = partition(units, self.config.max_parts);
        self.lock_pending().insert(batch_id, ranges.len());

        let mut master =
            JobRecord::master(batch_id, spec.content_ref.clone()).with_metadata(spec.metadata.clone());
        if let Some(message) = spec.message {
            master.message = message;
        }
        if let Err(e) = self.registry.track(master) {
            self.lock_pending().remove(&batch_id);
            return Err(e);
        }

        let mut sub_ids = Vec::with_capacity(ranges.len());
        for range in ranges {
            let sub = JobRecord::sub(batch_id, range, spec.content_ref.clone())
                .with_metadata(spec.metadata.clone());
            match self.registry.submit(sub) {
                Ok(id) => sub_ids.push(id),
                Err(e) => {
                    self.lock_pending().remove(&batch_id);
                    return Err(e);
                }
            }
        }

        info!(batch = %batch_id, subs = sub_ids.len(), units, "batch submitted");
        Ok(Submission::Batch {
            master_id: batch_id,
            sub_ids,
        })
    }

    /// Handles one terminal snapshot from the pool.
    async fn on_terminal(&self, record: JobRecord) {
        if record.role != JobRole::Sub {
            return;
        }
        let Some(batch_id) = record.batch_id else {
            return;
        };

        // Decrement-and-remove is one critical section; only the sibling
        // that empties the countdown sees `due`.
        let due = {
            let mut pending = self.lock_pending();
            match pending.get_mut(&batch_id) {
                Some(left) => {
                    *left -= 1;
                    let done = *left == 0;
                    if done {
                        pending.remove(&batch_id);
                    }
                    done
                }
                None => false,
            }
        };

        if due {
            self.consolidate(batch_id).await;
        }
    }

    /// Consolidates one batch: master to `Processing`, the hook over the
    /// succeeded siblings' outputs, master to its terminal state.
    async fn consolidate(&self, batch_id: JobId) {
        let master = match self.registry.apply(batch_id, Transition::Start) {
            Ok(master) => master,
            Err(e) => {
                warn!(batch = %batch_id, error = %e, "cannot start consolidation");
                return;
            }
        };

        let subs = self.registry.list_by_batch(batch_id);
        let total = subs.len();
        let parts: Vec<ExecOutput> = subs
            .iter()
            .filter(|sub| sub.state == JobState::Completed)
            .map(|sub| ExecOutput {
                result_refs: sub.result_refs.clone(),
                units: sub.units_done,
                message: sub.message.clone(),
            })
            .collect();
        let failed = total - parts.len();

        if parts.is_empty() {
            let error = format!("all {total} sub-jobs failed");
            warn!(batch = %batch_id, error, "batch failed");
            self.finish(batch_id, Transition::Fail { error });
            return;
        }

        let outcome = AssertUnwindSafe(self.executor.consolidate(master, parts))
            .catch_unwind()
            .await;
        let transition = match outcome {
            Ok(Ok(output)) => {
                let units = output.units;
                let message = if failed > 0 {
                    format!("{} ({failed} of {total} sub-jobs failed)", output.message)
                } else {
                    output.message
                };
                info!(batch = %batch_id, units, failed, "batch consolidated");
                Transition::Complete {
                    result_refs: output.result_refs,
                    units,
                    message,
                }
            }
            Ok(Err(e)) => {
                warn!(batch = %batch_id, error = %e, "consolidation failed");
                Transition::Fail {
                    error: format!("consolidation failed: {e}"),
                }
            }
            Err(panic) => {
                let error = format!("consolidation fault: {}", panic_message(&panic));
                warn!(batch = %batch_id, error, "consolidation hook panicked");
                Transition::Fail { error }
            }
        };
        self.finish(batch_id, transition);
    }

    fn finish(&self, batch_id: JobId, transition: Transition) {
        if let Err(e) = self.registry.apply(batch_id, transition) {
            warn!(batch = %batch_id, error = %e, "could not record batch outcome");
        }
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic.downcast_ref::<&str>().map_or_else(
        || {
            panic
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "unknown panic".to_string())
        },
        |s| (*s).to_string(),
    )
}
