//! Polling status streams for the quire engine.
//!
//! This crate provides the observation half of the engine:
//!
//! - [`job_frames`] - per-job status stream with change detection
//! - [`batch_frames`] - batch aggregate stream with derived status
//! - [`UnitSource`] - pluggable tracker for not-yet-submitted units
//! - [`StreamConfig`] - poll interval, heartbeat, and timeout

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod batch;
mod config;
mod frame;
mod single;
mod units;

pub use batch::batch_frames;
pub use config::StreamConfig;
pub use frame::{BatchFrame, BatchStatus, JobFrame};
pub use single::job_frames;
pub use units::{RegistryUnits, TrackedUnit, UnitSource};
