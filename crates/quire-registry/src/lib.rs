//! Thread-safe job registry and dispatch queue for the quire engine.
//!
//! This crate provides the one shared mutable resource of the engine:
//!
//! - [`JobRegistry`] - coarse-locked map of job id to [`quire_types::JobRecord`]
//! - [`DispatchReceiver`] - consumer end of the unbounded dispatch queue

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod registry;

pub use registry::{DispatchReceiver, JobRegistry};
