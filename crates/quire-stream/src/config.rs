//! Stream timing configuration.

use std::time::Duration;

/// Timing knobs shared by the single-job and batch streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// How often the registry is polled for changes.
    pub poll_interval: Duration,
    /// A frame is emitted after this long without a change, so consumers
    /// can tell a quiet stream from a dead one.
    pub heartbeat: Duration,
    /// Overall cap on stream lifetime. When it elapses the stream emits
    /// one `timed_out` frame and ends; the underlying jobs keep running.
    pub timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            heartbeat: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        }
    }
}
