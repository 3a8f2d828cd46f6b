//! Submission requests and the split decision.

use quire_types::JobId;

/// Splitting configuration for the batch coordinator.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Unit count above which a submission is split into sub-jobs. A
    /// submission without a unit-count hint is never split.
    pub split_threshold: u32,
    /// Maximum number of sub-jobs per batch. Usually set to the worker
    /// pool size so one split document can saturate the pool.
    pub max_parts: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            split_threshold: 200,
            max_parts: 3,
        }
    }
}

/// One unit of work as handed to [`BatchCoordinator::submit`].
///
/// [`BatchCoordinator::submit`]: crate::BatchCoordinator::submit
#[derive(Debug, Clone)]
pub struct WorkSpec {
    /// Opaque reference to the input content (file path, storage key).
    pub content_ref: String,
    /// Opaque caller metadata, passed through to the executor unmodified.
    pub metadata: serde_json::Value,
    /// Initial status message, replacing the default queued message on the
    /// standalone or master record.
    pub message: Option<String>,
    /// Total number of units (pages) in the content, if the caller knows
    /// it up front. Without this hint the work is never split.
    pub total_units: Option<u32>,
}

impl WorkSpec {
    /// Creates a spec for the given content with no metadata and no
    /// unit-count hint.
    #[must_use]
    pub fn new(content_ref: impl Into<String>) -> Self {
        Self {
            content_ref: content_ref.into(),
            metadata: serde_json::Value::Null,
            message: None,
            total_units: None,
        }
    }

    /// Attaches opaque caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the initial status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Declares the total unit count, enabling the split decision.
    #[must_use]
    pub fn with_total_units(mut self, units: u32) -> Self {
        self.total_units = Some(units);
        self
    }
}

/// What a submission turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The work fit under the split threshold and runs as one job.
    Standalone(JobId),
    /// The work was split into sub-jobs under a master record.
    Batch {
        /// Id of the master record, equal to the batch id.
        master_id: JobId,
        /// Ids of the dispatched sub-jobs, in page order.
        sub_ids: Vec<JobId>,
    },
}

impl Submission {
    /// Returns the id a caller should poll for overall status: the job id
    /// for a standalone submission, the master id for a batch.
    #[must_use]
    pub fn tracking_id(&self) -> JobId {
        match self {
            Self::Standalone(id) => *id,
            Self::Batch { master_id, .. } => *master_id,
        }
    }
}
