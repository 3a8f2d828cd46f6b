//! The executor plug-in seam.

use crate::ProgressHandle;
use async_trait::async_trait;
use quire_types::JobRecord;

/// Result of processing one job or consolidating one batch.
///
/// The engine never inspects result contents; it only propagates them onto
/// the job record.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// Opaque handles to whatever the executor produced (file paths,
    /// storage keys, download URLs).
    pub result_refs: Vec<String>,
    /// Number of units (pages) processed.
    pub units: u32,
    /// Final status message for the record.
    pub message: String,
}

impl ExecOutput {
    /// Merges several outputs: concatenated result refs, summed units.
    ///
    /// Used by the default [`Executor::consolidate`] implementation.
    #[must_use]
    pub fn merged(parts: Vec<Self>) -> Self {
        let count = parts.len();
        let mut refs = Vec::new();
        let mut units = 0u32;
        for part in parts {
            refs.extend(part.result_refs);
            units += part.units;
        }
        Self {
            result_refs: refs,
            units,
            message: format!("consolidated {count} sub-jobs, {units} units"),
        }
    }
}

/// Caller-supplied hook performing the actual document processing.
///
/// This is the plug-in seam for OCR extraction, field parsing, and
/// persistence. Workers invoke [`execute`](Self::execute) for every
/// dispatched job; the batch coordinator invokes
/// [`consolidate`](Self::consolidate) exactly once per batch, after every
/// sub-job has reached a terminal state.
///
/// Errors returned from either hook are captured on the job record as a
/// `Failed` state. They are never propagated to the submitter and never
/// crash a worker.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Processes one unit of work.
    ///
    /// `job` is a snapshot of the record at dispatch time; `progress` lets
    /// the executor push intermediate progress and message updates to the
    /// job's own record.
    async fn execute(&self, job: JobRecord, progress: ProgressHandle)
    -> anyhow::Result<ExecOutput>;

    /// Aggregates the outputs of a batch's succeeded sub-jobs.
    ///
    /// `parts` contains outputs of succeeded siblings only, ordered by
    /// page range. The default implementation concatenates result refs and
    /// sums unit counts.
    async fn consolidate(
        &self,
        master: JobRecord,
        parts: Vec<ExecOutput>,
    ) -> anyhow::Result<ExecOutput> {
        let _ = master;
        Ok(ExecOutput::merged(parts))
    }
}
