//! Error types for quire.

use crate::{JobId, JobState};
use thiserror::Error;

/// Errors raised synchronously at submission time.
///
/// Execution-time failures are never raised here; they are captured on the
/// job record and observed through status queries and streams.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// A job with this id is already tracked by the registry.
    #[error("Duplicate job id: {0}")]
    DuplicateJob(JobId),
}

/// Errors from registry lookups and mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No record with this id is tracked by the registry.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The requested state change violates the monotonic transition set.
    /// The record is left in its prior state.
    #[error("Illegal transition for job {id}: {from} -> {to}")]
    IllegalTransition {
        /// The job whose transition was rejected.
        id: JobId,
        /// The state the record was (and still is) in.
        from: JobState,
        /// The state the rejected transition targeted.
        to: JobState,
    },
}
