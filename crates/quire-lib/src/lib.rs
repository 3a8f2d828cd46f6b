//! Asynchronous document-processing job engine.
//!
//! This is a facade crate that re-exports functionality from the quire
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use quire_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(JobRegistry::new());
//!     let executor: Arc<dyn Executor> = Arc::new(MyOcrExecutor::new());
//!
//!     let coordinator = BatchCoordinator::new(
//!         Arc::clone(&registry),
//!         Arc::clone(&executor),
//!         SplitConfig::default(),
//!     );
//!     let pool = WorkerPool::start_with_completions(
//!         Arc::clone(&registry),
//!         executor,
//!         PoolConfig::default(),
//!         coordinator.completions(),
//!     )?;
//!
//!     let submission = coordinator.submit(
//!         WorkSpec::new("upload/report.pdf").with_total_units(250),
//!     )?;
//!     println!("tracking {}", submission.tracking_id());
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use quire_types::*;

// Re-export the registry
pub use quire_registry::{DispatchReceiver, JobRegistry};

// Re-export the worker pool and executor seam
#[cfg(feature = "pool")]
pub use quire_pool::{ExecOutput, Executor, PoolConfig, PoolError, ProgressHandle, WorkerPool};

// Re-export batch coordination
#[cfg(feature = "batch")]
pub use quire_batch::{BatchCoordinator, SplitConfig, Submission, WorkSpec};

// Re-export status streams
#[cfg(feature = "stream")]
pub use quire_stream::{
    BatchFrame, BatchStatus, JobFrame, RegistryUnits, StreamConfig, TrackedUnit, UnitSource,
    batch_frames, job_frames,
};

/// Prelude module for convenient imports.
///
/// ```
/// use quire_lib::prelude::*;
/// ```
pub mod prelude {
    pub use quire_registry::JobRegistry;
    pub use quire_types::{
        JobId, JobRecord, JobRole, JobState, PageRange, RegistryError, SubmitError, Transition,
    };

    #[cfg(feature = "pool")]
    pub use quire_pool::{ExecOutput, Executor, PoolConfig, ProgressHandle, WorkerPool};

    #[cfg(feature = "batch")]
    pub use quire_batch::{BatchCoordinator, SplitConfig, Submission, WorkSpec};

    #[cfg(feature = "stream")]
    pub use quire_stream::{
        BatchFrame, BatchStatus, JobFrame, RegistryUnits, StreamConfig, UnitSource, batch_frames,
        job_frames,
    };
}
