//! Fixed-size worker pool and executor seam for the quire engine.
//!
//! This crate provides the execution half of the engine:
//!
//! - [`Executor`] - caller-supplied plug-in performing the actual work
//! - [`ExecOutput`] - opaque result handles produced by the executor
//! - [`ProgressHandle`] - per-job progress reporting for executors
//! - [`WorkerPool`] - long-lived workers draining the dispatch queue

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/quirelabs/quire/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod executor;
mod pool;
mod progress;

pub use executor::{ExecOutput, Executor};
pub use pool::{PoolConfig, PoolError, WorkerPool};
pub use progress::ProgressHandle;
