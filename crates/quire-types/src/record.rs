//! Job records and state transitions.

use crate::{JobState, PageRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a processing job.
pub type JobId = Uuid;

/// Role of a job record within the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobRole {
    /// An independent job, not part of any batch.
    #[default]
    Standalone,
    /// One partition of a split job; shares a batch id with its siblings.
    Sub,
    /// The aggregate record of a batch; never dispatched, only consolidated.
    Master,
}

/// A state change applied to a [`JobRecord`] by the registry.
///
/// Transitions are validated against the monotonic edge set in
/// [`JobState::can_transition_to`]; an illegal transition is rejected and
/// the record is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A worker picked the job up: `Queued -> Processing`.
    Start,
    /// Intermediate progress pushed by the executor while `Processing`.
    Progress {
        /// Progress percentage, 0-100. Values below the current progress
        /// are ignored so observed progress never decreases.
        pct: u8,
        /// Status message.
        message: String,
    },
    /// Successful completion: `Processing -> Completed`, progress forced
    /// to 100.
    Complete {
        /// Opaque result handles produced by the executor.
        result_refs: Vec<String>,
        /// Number of units (pages) processed.
        units: u32,
        /// Final status message.
        message: String,
    },
    /// Failure: `Processing -> Failed`.
    Fail {
        /// Error message captured on the record.
        error: String,
    },
}

impl Transition {
    /// Returns the state this transition moves a record into.
    #[must_use]
    pub const fn target_state(&self) -> JobState {
        match self {
            Self::Start | Self::Progress { .. } => JobState::Processing,
            Self::Complete { .. } => JobState::Completed,
            Self::Fail { .. } => JobState::Failed,
        }
    }
}

/// Mutable state holder for one unit of work.
///
/// A record is created at submission and mutated only through the registry,
/// which serializes all writes. Cloning a record yields an immutable
/// point-in-time snapshot that is safe to hand to a consumer without
/// holding any lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier, immutable for the life of the record.
    pub id: JobId,
    /// Batch the job belongs to. A sub-job's batch id always equals its
    /// master's id; a standalone job has none.
    pub batch_id: Option<JobId>,
    /// Role of the record within the engine.
    pub role: JobRole,
    /// Current lifecycle state.
    pub state: JobState,
    /// Progress percentage, 0-100. Non-decreasing while non-terminal,
    /// forced to 100 on completion.
    pub progress: u8,
    /// Human-readable status message.
    pub message: String,
    /// Timestamp when the record was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when a worker started processing.
    pub started_at: Option<DateTime<Utc>>,
    /// Timestamp when the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Page span assigned to a sub-job.
    pub page_range: Option<PageRange>,
    /// Opaque result handles produced by the executor. The engine never
    /// inspects their contents.
    pub result_refs: Vec<String>,
    /// Number of units (pages) processed so far.
    pub units_done: u32,
    /// Error message if the job failed.
    pub error: Option<String>,
    /// Opaque reference to the input content.
    pub content_ref: String,
    /// Opaque caller metadata, passed through to the executor unmodified.
    pub metadata: serde_json::Value,
}

impl JobRecord {
    /// Default message for a freshly submitted job.
    const QUEUED_MESSAGE: &'static str = "waiting in queue";

    fn new(id: JobId, role: JobRole, batch_id: Option<JobId>, content_ref: String) -> Self {
        Self {
            id,
            batch_id,
            role,
            state: JobState::Queued,
            progress: 0,
            message: Self::QUEUED_MESSAGE.to_string(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            page_range: None,
            result_refs: Vec::new(),
            units_done: 0,
            error: None,
            content_ref,
            metadata: serde_json::Value::Null,
        }
    }

    /// Creates a standalone job with a fresh id.
    #[must_use]
    pub fn standalone(content_ref: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), JobRole::Standalone, None, content_ref.into())
    }

    /// Creates a sub-job for one partition of a batch.
    #[must_use]
    pub fn sub(batch_id: JobId, range: PageRange, content_ref: impl Into<String>) -> Self {
        let mut record = Self::new(
            Uuid::new_v4(),
            JobRole::Sub,
            Some(batch_id),
            content_ref.into(),
        );
        record.page_range = Some(range);
        record.message = format!("waiting in queue (pages {range})");
        record
    }

    /// Creates the master record of a batch. Its id equals the batch id.
    #[must_use]
    pub fn master(batch_id: JobId, content_ref: impl Into<String>) -> Self {
        let mut record = Self::new(batch_id, JobRole::Master, Some(batch_id), content_ref.into());
        record.message = "waiting for sub-jobs".to_string();
        record
    }

    /// Attaches opaque caller metadata, passed through to the executor.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns true if the job is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns the wall-clock processing duration, if the job has started.
    ///
    /// For a running job this is the time since it started; for a finished
    /// job it is the start-to-finish duration.
    #[must_use]
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - started)
    }

    /// Applies a validated transition. Callers are expected to have checked
    /// legality; see [`JobRegistry::apply`] in `quire-registry`, which is
    /// the only mutation path at runtime.
    ///
    /// [`JobRegistry::apply`]: https://docs.rs/quire-registry
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Start => {
                self.state = JobState::Processing;
                self.started_at = Some(Utc::now());
                self.message = "processing".to_string();
            }
            Transition::Progress { pct, message } => {
                // Observed progress never decreases.
                self.progress = self.progress.max(pct.min(100));
                self.message = message;
            }
            Transition::Complete {
                result_refs,
                units,
                message,
            } => {
                self.state = JobState::Completed;
                self.progress = 100;
                self.finished_at = Some(Utc::now());
                self.result_refs = result_refs;
                self.units_done = units;
                self.message = message;
            }
            Transition::Fail { error } => {
                self.state = JobState::Failed;
                self.finished_at = Some(Utc::now());
                self.message = format!("error: {error}");
                self.error = Some(error);
            }
        }
    }
}
