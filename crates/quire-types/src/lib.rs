//! Core types for the quire document-job orchestration engine.
//!
//! This crate provides the fundamental data structures used throughout quire:
//!
//! - [`JobId`] - Unique identifier for processing jobs
//! - [`JobState`] - Lifecycle state of a job, with a monotonic transition set
//! - [`JobRole`] - Standalone job, batch sub-job, or batch master
//! - [`PageRange`] - Contiguous 1-based page span assigned to a sub-job
//! - [`JobRecord`] - Mutable state holder for one unit of work
//! - [`Transition`] - State change applied to a record by the registry

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod range;
mod record;
mod state;

pub use error::{RegistryError, SubmitError};
pub use range::{PageRange, partition};
pub use record::{JobId, JobRecord, JobRole, Transition};
pub use state::JobState;
