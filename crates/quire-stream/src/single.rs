//! Single-job status stream.

use crate::{JobFrame, StreamConfig};
use futures::stream::{self, Stream};
use quire_registry::JobRegistry;
use quire_types::{JobId, JobState};
use std::sync::Arc;
use tokio::time::Instant;

struct PollState {
    seq: u64,
    started: Instant,
    last_emit: Instant,
    fingerprint: Option<(JobState, u8)>,
    first: bool,
    done: bool,
}

/// Streams status frames for one job.
///
/// The current snapshot is emitted immediately. After that the registry is
/// polled at `poll_interval` and a frame is emitted only when the job's
/// state or progress changed, or when `heartbeat` elapses without a
/// change. The stream ends after a `finished` frame (job reached a
/// terminal state), after a single `timed_out` frame, or immediately if
/// the id is unknown. Opening a stream on an already-terminal job yields
/// exactly one finished frame.
///
/// The stream is a pure reader; dropping it has no effect on the job.
pub fn job_frames(
    registry: Arc<JobRegistry>,
    id: JobId,
    config: StreamConfig,
) -> impl Stream<Item = JobFrame> {
    let now = Instant::now();
    let state = PollState {
        seq: 0,
        started: now,
        last_emit: now,
        fingerprint: None,
        first: true,
        done: false,
    };

    stream::unfold(state, move |mut st| {
        let registry = Arc::clone(&registry);
        let config = config.clone();
        async move {
            if st.done {
                return None;
            }
            loop {
                if st.first {
                    st.first = false;
                } else {
                    if st.started.elapsed() >= config.timeout {
                        tracing::debug!(job = %id, "status stream timed out");
                        let job = registry.get(id)?;
                        st.done = true;
                        let frame = JobFrame {
                            seq: st.seq,
                            job,
                            finished: false,
                            timed_out: true,
                        };
                        return Some((frame, st));
                    }
                    tokio::time::sleep(config.poll_interval).await;
                }

                // Unknown id, or swept mid-stream: end without a frame.
                let Some(job) = registry.get(id) else {
                    return None;
                };

                let fingerprint = (job.state, job.progress);
                let changed = st.fingerprint != Some(fingerprint);
                let heartbeat_due = st.last_emit.elapsed() >= config.heartbeat;
                if !(changed || heartbeat_due) {
                    continue;
                }

                st.fingerprint = Some(fingerprint);
                st.last_emit = Instant::now();
                let finished = job.is_terminal();
                st.done = finished;
                let frame = JobFrame {
                    seq: st.seq,
                    job,
                    finished,
                    timed_out: false,
                };
                st.seq += 1;
                return Some((frame, st));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use quire_types::{JobRecord, Transition};
    use std::time::Duration;

    fn fast_config() -> StreamConfig {
        StreamConfig {
            poll_interval: Duration::from_millis(100),
            heartbeat: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn already_terminal_job_yields_one_finished_frame() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();
        registry.apply(id, Transition::Start).unwrap();
        registry
            .apply(
                id,
                Transition::Complete {
                    result_refs: vec!["out/doc.zip".to_string()],
                    units: 7,
                    message: String::new(),
                },
            )
            .unwrap();

        let frames: Vec<JobFrame> =
            job_frames(Arc::clone(&registry), id, fast_config()).collect().await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].finished);
        assert!(!frames[0].timed_out);
        assert_eq!(frames[0].seq, 0);
        assert_eq!(frames[0].job.state, JobState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_id_yields_empty_stream() {
        let registry = Arc::new(JobRegistry::new());
        let frames: Vec<JobFrame> =
            job_frames(registry, uuid::Uuid::new_v4(), fast_config()).collect().await;
        assert!(frames.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn emits_on_state_and_progress_changes_only() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();

        let mut stream = Box::pin(job_frames(Arc::clone(&registry), id, fast_config()));

        // Immediate snapshot of the queued job.
        let first = stream.next().await.unwrap();
        assert_eq!(first.job.state, JobState::Queued);
        assert!(!first.finished);

        registry.apply(id, Transition::Start).unwrap();
        let started = stream.next().await.unwrap();
        assert_eq!(started.job.state, JobState::Processing);
        assert_eq!(started.seq, 1);

        registry
            .apply(
                id,
                Transition::Progress {
                    pct: 40,
                    message: "page 4".to_string(),
                },
            )
            .unwrap();
        let progressed = stream.next().await.unwrap();
        assert_eq!(progressed.job.progress, 40);

        registry
            .apply(
                id,
                Transition::Complete {
                    result_refs: Vec::new(),
                    units: 10,
                    message: String::new(),
                },
            )
            .unwrap();
        let last = stream.next().await.unwrap();
        assert!(last.finished);
        assert_eq!(last.job.progress, 100);

        // Nothing after the finished frame.
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_fires_without_changes() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();
        registry.apply(id, Transition::Start).unwrap();

        let mut stream = Box::pin(job_frames(Arc::clone(&registry), id, fast_config()));
        let first = stream.next().await.unwrap();
        assert_eq!(first.seq, 0);

        // No further mutation; the next frame is a heartbeat after ~15 s
        // of auto-advanced time.
        let heartbeat = stream.next().await.unwrap();
        assert_eq!(heartbeat.seq, 1);
        assert_eq!(heartbeat.job.state, JobState::Processing);
        assert!(!heartbeat.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_emits_one_final_frame() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry
            .submit(JobRecord::standalone("upload/doc.pdf"))
            .unwrap();
        registry.apply(id, Transition::Start).unwrap();

        // A job that never finishes: the stream ends with timed_out.
        let frames: Vec<JobFrame> =
            job_frames(Arc::clone(&registry), id, fast_config()).collect().await;
        let last = frames.last().unwrap();
        assert!(last.timed_out);
        assert!(!last.finished);
        assert_eq!(frames.iter().filter(|f| f.timed_out).count(), 1);
        // Initial frame, one heartbeat per 15 s, one timeout frame.
        assert!((40..=42).contains(&frames.len()), "{} frames", frames.len());

        // The job itself is untouched.
        assert_eq!(registry.get(id).unwrap().state, JobState::Processing);
    }
}
