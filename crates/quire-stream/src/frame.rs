//! Frame types emitted by the status streams.

use quire_types::JobRecord;
use serde::{Deserialize, Serialize};

/// One update from a single-job stream.
///
/// Frames are independently parseable; `seq` is monotonically increasing
/// within one stream so consumers can detect gaps after a reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFrame {
    /// Position of this frame within the stream, starting at zero.
    pub seq: u64,
    /// Snapshot of the job at emission time.
    pub job: JobRecord,
    /// True on the final frame of a job that reached a terminal state.
    /// No further frames follow.
    pub finished: bool,
    /// True when the stream hit its overall timeout before the job
    /// finished. No further frames follow; the job keeps running.
    pub timed_out: bool,
}

/// Aggregate status of a batch, derived each poll tick.
///
/// Derivation is first-match: `Empty` if nothing is tracked, `Uploading`
/// if any tracked unit has no job yet, `Running` if any job is queued or
/// processing, `Done` if everything tracked is terminal, and `Pending`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Nothing is tracked under this batch id.
    Empty,
    /// At least one tracked unit has no job assigned yet.
    Uploading,
    /// At least one job is queued or processing.
    Running,
    /// Tracked units exist whose jobs are not yet resolvable, and nothing
    /// is running.
    Pending,
    /// Every tracked unit and job is terminal.
    Done,
}

/// One update from a batch stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFrame {
    /// Position of this frame within the stream, starting at zero.
    pub seq: u64,
    /// Derived aggregate status.
    pub status: BatchStatus,
    /// Snapshot of the master record, if one is tracked.
    pub master: Option<JobRecord>,
    /// Snapshots of the batch's sub-jobs, ordered by page range.
    pub jobs: Vec<JobRecord>,
    /// Number of tracked units.
    pub units_total: u32,
    /// Number of tracked units whose job reached a terminal state.
    pub units_done: u32,
    /// True on the final frame, once the derived status is `Done`.
    pub finished: bool,
    /// True when the stream hit its overall timeout first.
    pub timed_out: bool,
}
