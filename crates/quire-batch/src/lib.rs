//! Batch splitting and exactly-once consolidation for the quire engine.
//!
//! This crate provides the fan-out/fan-in half of the engine:
//!
//! - [`WorkSpec`] - a submission request with an optional unit-count hint
//! - [`SplitConfig`] - threshold and fan-out width for splitting
//! - [`Submission`] - what a submission turned into (standalone or batch)
//! - [`BatchCoordinator`] - splits work, tracks masters, consolidates

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coordinator;
mod submit;

pub use coordinator::BatchCoordinator;
pub use submit::{SplitConfig, Submission, WorkSpec};
