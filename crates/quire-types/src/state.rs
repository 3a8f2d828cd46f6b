//! Job lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a processing job.
///
/// Transitions are monotonic: `Queued -> Processing -> {Completed, Failed}`.
/// A job observed in a terminal state never reports an earlier state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job is queued but not yet picked up by a worker.
    #[default]
    Queued,
    /// Job is currently being processed by a worker.
    Processing,
    /// Job completed successfully.
    Completed,
    /// Job failed with an error.
    Failed,
}

impl JobState {
    /// Returns true if the state is terminal (no further transitions occur).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if `next` is a legal direct transition from this state.
    ///
    /// The legal edges are `Queued -> Processing`,
    /// `Processing -> Completed`, and `Processing -> Failed`. Everything
    /// else, including any transition out of a terminal state, is illegal.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
