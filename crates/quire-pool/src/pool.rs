//! The fixed-size worker pool.

use crate::{ExecOutput, Executor, ProgressHandle};
use futures::FutureExt;
use quire_registry::{DispatchReceiver, JobRegistry};
use quire_types::{JobId, JobRecord, Transition};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of long-lived workers. At most this many jobs are ever in
    /// the `Processing` state simultaneously, system-wide.
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: 3 }
    }
}

/// Errors that can occur when starting the pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The registry's dispatch consumer was already taken; only one pool
    /// may drain a registry.
    #[error("Dispatch queue consumer already taken")]
    DispatchTaken,
}

/// A fixed-size set of long-lived workers draining the dispatch queue.
///
/// Each worker loops: dequeue a job id, transition the job to
/// `Processing`, invoke the [`Executor`], record the outcome. Executor
/// errors and panics are captured on the job record; the worker always
/// returns to idle. The pool treats sub-jobs exactly like standalone jobs;
/// splitting decisions are made before submission by the batch
/// coordinator.
///
/// Shutdown is cooperative: workers check a shutdown signal while blocked
/// on the queue, finish their in-flight job, and exit. There is no
/// cancellation of in-flight work.
#[derive(Debug)]
pub struct WorkerPool {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `config.workers` workers draining the registry's dispatch
    /// queue.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DispatchTaken`] if another pool already took
    /// the registry's dispatch consumer.
    pub fn start(
        registry: Arc<JobRegistry>,
        executor: Arc<dyn Executor>,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        Self::spawn(registry, executor, config, None)
    }

    /// Like [`start`](Self::start), but additionally sends a snapshot of
    /// every job that reaches a terminal state to `completions`.
    ///
    /// The batch coordinator listens on this channel to trigger its
    /// all-siblings-terminal check.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DispatchTaken`] if another pool already took
    /// the registry's dispatch consumer.
    pub fn start_with_completions(
        registry: Arc<JobRegistry>,
        executor: Arc<dyn Executor>,
        config: PoolConfig,
        completions: UnboundedSender<JobRecord>,
    ) -> Result<Self, PoolError> {
        Self::spawn(registry, executor, config, Some(completions))
    }

    fn spawn(
        registry: Arc<JobRegistry>,
        executor: Arc<dyn Executor>,
        config: PoolConfig,
        completions: Option<UnboundedSender<JobRecord>>,
    ) -> Result<Self, PoolError> {
        let rx = registry.take_dispatch_rx().ok_or(PoolError::DispatchTaken)?;
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            handles.push(tokio::spawn(worker_loop(
                index,
                Arc::clone(&rx),
                shutdown_rx.clone(),
                Arc::clone(&registry),
                Arc::clone(&executor),
                completions.clone(),
            )));
        }
        info!(workers, "worker pool started");

        Ok(Self {
            shutdown_tx,
            handles,
        })
    }

    /// Returns the number of workers in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Signals all workers to stop and waits for them to exit.
    ///
    /// In-flight jobs run to their terminal state first; queued jobs stay
    /// queued.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("worker pool stopped");
    }
}

/// One worker: block on the queue, process, return to idle.
async fn worker_loop(
    index: usize,
    rx: Arc<Mutex<DispatchReceiver>>,
    mut shutdown: watch::Receiver<bool>,
    registry: Arc<JobRegistry>,
    executor: Arc<dyn Executor>,
    completions: Option<UnboundedSender<JobRecord>>,
) {
    loop {
        // The queue mutex is held only while waiting for the next id, so
        // exactly one idle worker dequeues at a time.
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                id = rx.recv() => id,
            }
        };
        let Some(id) = next else { break };

        process_one(index, id, &registry, &executor, completions.as_ref()).await;
    }
    debug!(worker = index, "worker stopped");
}

/// Runs one dispatched job through the executor and records the outcome.
async fn process_one(
    index: usize,
    id: JobId,
    registry: &Arc<JobRegistry>,
    executor: &Arc<dyn Executor>,
    completions: Option<&UnboundedSender<JobRecord>>,
) {
    let record = match registry.apply(id, Transition::Start) {
        Ok(record) => record,
        Err(e) => {
            // Swept or otherwise gone; nothing to run.
            warn!(worker = index, job = %id, error = %e, "skipping dispatched job");
            return;
        }
    };
    info!(worker = index, job = %id, "job started");

    let progress = ProgressHandle::new(Arc::clone(registry), id);
    let outcome = AssertUnwindSafe(executor.execute(record, progress))
        .catch_unwind()
        .await;

    let transition = match outcome {
        Ok(Ok(output)) => complete_transition(output),
        Ok(Err(e)) => {
            warn!(job = %id, error = %e, "job failed");
            Transition::Fail {
                error: e.to_string(),
            }
        }
        Err(panic) => {
            let error = format!("worker fault: {}", panic_message(&panic));
            warn!(job = %id, error, "executor panicked");
            Transition::Fail { error }
        }
    };

    match registry.apply(id, transition) {
        Ok(terminal) => {
            info!(job = %id, state = %terminal.state, "job finished");
            if let Some(tx) = completions {
                let _ = tx.send(terminal);
            }
        }
        Err(e) => warn!(job = %id, error = %e, "could not record job outcome"),
    }
}

fn complete_transition(output: ExecOutput) -> Transition {
    let units = output.units;
    let message = if output.message.is_empty() {
        format!("processing completed: {units} units")
    } else {
        output.message
    };
    Transition::Complete {
        result_refs: output.result_refs,
        units,
        message,
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
