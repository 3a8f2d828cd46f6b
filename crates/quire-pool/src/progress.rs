//! Per-job progress reporting for executors.

use quire_registry::JobRegistry;
use quire_types::{JobId, Transition};
use std::sync::Arc;
use tracing::debug;

/// Handle an executor uses to push progress updates to its own job record.
///
/// Bound to a single job id, so concurrent executors never contend over
/// each other's records. Updates that lose a race with a terminal
/// transition are quietly dropped; reporting progress never fails inside
/// an executor.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    registry: Arc<JobRegistry>,
    id: JobId,
}

impl ProgressHandle {
    /// Creates a handle for the given job.
    #[must_use]
    pub const fn new(registry: Arc<JobRegistry>, id: JobId) -> Self {
        Self { registry, id }
    }

    /// Returns the id of the job this handle reports for.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.id
    }

    /// Updates the job's progress percentage and status message.
    ///
    /// Values above 100 are clamped; values below the current progress are
    /// ignored, so observed progress never decreases.
    pub fn update(&self, pct: u8, message: impl Into<String>) {
        let result = self.registry.apply(
            self.id,
            Transition::Progress {
                pct,
                message: message.into(),
            },
        );
        if let Err(e) = result {
            debug!(job = %self.id, error = %e, "progress update dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_types::{JobRecord, JobState};

    #[test]
    fn update_writes_through_to_record() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();
        registry.apply(id, Transition::Start).unwrap();

        let handle = ProgressHandle::new(Arc::clone(&registry), id);
        handle.update(55, "page 5 of 9");

        let record = registry.get(id).unwrap();
        assert_eq!(record.progress, 55);
        assert_eq!(record.message, "page 5 of 9");
    }

    #[test]
    fn update_after_terminal_is_dropped() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();
        registry.apply(id, Transition::Start).unwrap();
        registry
            .apply(
                id,
                Transition::Fail {
                    error: "boom".to_string(),
                },
            )
            .unwrap();

        let handle = ProgressHandle::new(Arc::clone(&registry), id);
        handle.update(99, "too late");

        let record = registry.get(id).unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_ne!(record.message, "too late");
    }
}
