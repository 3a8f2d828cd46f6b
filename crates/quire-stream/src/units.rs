//! Tracked units and the pluggable unit source.

use quire_registry::JobRegistry;
use quire_types::JobId;
use std::sync::Arc;

/// One unit of content tracked under a batch, possibly before a job
/// exists for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedUnit {
    /// Host-assigned label for the unit (an upload id, a page-range
    /// label). Opaque to the engine.
    pub id: String,
    /// Job processing this unit, once one has been submitted.
    pub job_id: Option<JobId>,
}

/// Source of the units a batch stream should account for.
///
/// The engine's own [`RegistryUnits`] derives units from submitted
/// sub-jobs. A host that tracks uploads before submission can supply its
/// own source so the batch stream reports `Uploading` for content that has
/// no job yet.
pub trait UnitSource: Send + Sync {
    /// Returns the units currently tracked under the batch.
    fn tracked_units(&self, batch_id: JobId) -> Vec<TrackedUnit>;
}

/// Unit source backed by the registry: one unit per sub-job, always
/// assigned.
#[derive(Debug)]
pub struct RegistryUnits {
    registry: Arc<JobRegistry>,
}

impl RegistryUnits {
    /// Creates a source reading sub-jobs from the given registry.
    #[must_use]
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }
}

impl UnitSource for RegistryUnits {
    fn tracked_units(&self, batch_id: JobId) -> Vec<TrackedUnit> {
        self.registry
            .list_by_batch(batch_id)
            .into_iter()
            .map(|job| TrackedUnit {
                id: job
                    .page_range
                    .map_or_else(|| job.id.to_string(), |range| format!("pages {range}")),
                job_id: Some(job.id),
            })
            .collect()
    }
}
