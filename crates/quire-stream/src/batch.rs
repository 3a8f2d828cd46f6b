//! Batch aggregate status stream.

use crate::{BatchFrame, BatchStatus, StreamConfig, TrackedUnit, UnitSource};
use futures::stream::{self, Stream};
use quire_registry::JobRegistry;
use quire_types::{JobId, JobRecord, JobRole, JobState};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

/// Derives the aggregate status with first-match precedence.
fn derive_status(
    units: &[TrackedUnit],
    master: Option<&JobRecord>,
    jobs: &[JobRecord],
) -> BatchStatus {
    if units.is_empty() && jobs.is_empty() && master.is_none() {
        return BatchStatus::Empty;
    }
    if units.iter().any(|u| u.job_id.is_none()) {
        return BatchStatus::Uploading;
    }
    if jobs.iter().chain(master).any(|j| !j.is_terminal()) {
        return BatchStatus::Running;
    }
    // Units whose jobs the registry no longer (or does not yet) know.
    let known: HashSet<JobId> = jobs.iter().chain(master).map(|j| j.id).collect();
    if units
        .iter()
        .any(|u| u.job_id.is_some_and(|id| !known.contains(&id)))
    {
        return BatchStatus::Pending;
    }
    BatchStatus::Done
}

/// One poll tick's view of a batch.
struct Observation {
    tracked: Vec<TrackedUnit>,
    master: Option<JobRecord>,
    jobs: Vec<JobRecord>,
    status: BatchStatus,
}

impl Observation {
    fn take(registry: &JobRegistry, units: &dyn UnitSource, batch_id: JobId) -> Self {
        let tracked = units.tracked_units(batch_id);
        let master = registry.get(batch_id).filter(|j| j.role == JobRole::Master);
        let jobs = registry.list_by_batch(batch_id);
        let status = derive_status(&tracked, master.as_ref(), &jobs);
        Self {
            tracked,
            master,
            jobs,
            status,
        }
    }

    fn fingerprint(&self) -> (BatchStatus, usize, Vec<(JobId, JobState, u8)>) {
        let members = self
            .jobs
            .iter()
            .chain(self.master.as_ref())
            .map(|j| (j.id, j.state, j.progress))
            .collect();
        (self.status, self.tracked.len(), members)
    }

    fn units_done(&self) -> u32 {
        self.tracked
            .iter()
            .filter(|u| {
                u.job_id.is_some_and(|id| {
                    self.jobs
                        .iter()
                        .chain(self.master.as_ref())
                        .any(|j| j.id == id && j.is_terminal())
                })
            })
            .count() as u32
    }

    fn into_frame(self, seq: u64, finished: bool, timed_out: bool) -> BatchFrame {
        let units_total = self.tracked.len() as u32;
        let units_done = self.units_done();
        BatchFrame {
            seq,
            status: self.status,
            master: self.master,
            jobs: self.jobs,
            units_total,
            units_done,
            finished,
            timed_out,
        }
    }
}

struct PollState {
    seq: u64,
    started: Instant,
    last_emit: Instant,
    fingerprint: Option<(BatchStatus, usize, Vec<(JobId, JobState, u8)>)>,
    first: bool,
    done: bool,
}

/// Streams aggregate status frames for one batch.
///
/// Each tick combines the master record, every known sub-job, and the
/// units reported by `units` into one frame with a derived
/// [`BatchStatus`]. A frame is emitted immediately, then on any member
/// state change, membership change, or status change, or on heartbeat.
/// The stream ends after one `finished` frame once the derived status is
/// [`BatchStatus::Done`], or after one `timed_out` frame.
///
/// The stream is a pure reader; dropping it has no effect on the batch.
pub fn batch_frames(
    registry: Arc<JobRegistry>,
    units: Arc<dyn UnitSource>,
    batch_id: JobId,
    config: StreamConfig,
) -> impl Stream<Item = BatchFrame> {
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
        let units = Arc::clone(&units);
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
                        tracing::debug!(batch = %batch_id, "batch stream timed out");
                        let observed = Observation::take(&registry, units.as_ref(), batch_id);
                        st.done = true;
                        let frame = observed.into_frame(st.seq, false, true);
                        return Some((frame, st));
                    }
                    tokio::time::sleep(config.poll_interval).await;
                }

                let observed = Observation::take(&registry, units.as_ref(), batch_id);
                let fingerprint = observed.fingerprint();
                let changed = st.fingerprint.as_ref() != Some(&fingerprint);
                let heartbeat_due = st.last_emit.elapsed() >= config.heartbeat;
                if !(changed || heartbeat_due) {
                    continue;
                }

                st.fingerprint = Some(fingerprint);
                st.last_emit = Instant::now();
                let finished = observed.status == BatchStatus::Done;
                st.done = finished;
                let frame = observed.into_frame(st.seq, finished, false);
                st.seq += 1;
                return Some((frame, st));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryUnits;
    use futures::StreamExt;
    use quire_types::{PageRange, Transition};
    use std::time::Duration;

    fn fast_config() -> StreamConfig {
        StreamConfig {
            poll_interval: Duration::from_millis(100),
            heartbeat: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        }
    }

    fn seeded_batch(registry: &JobRegistry) -> (JobId, Vec<JobId>) {
        let batch_id = uuid::Uuid::new_v4();
        registry
            .track(JobRecord::master(batch_id, "upload/doc.pdf"))
            .unwrap();
        let subs = [(1, 84), (85, 168), (169, 250)]
            .into_iter()
            .map(|(start, end)| {
                registry
                    .submit(JobRecord::sub(
                        batch_id,
                        PageRange::new(start, end),
                        "upload/doc.pdf",
                    ))
                    .unwrap()
            })
            .collect();
        (batch_id, subs)
    }

    fn complete(registry: &JobRegistry, id: JobId, units: u32) {
        registry.apply(id, Transition::Start).unwrap();
        registry
            .apply(
                id,
                Transition::Complete {
                    result_refs: Vec::new(),
                    units,
                    message: String::new(),
                },
            )
            .unwrap();
    }

    #[test]
    fn status_precedence() {
        let unassigned = TrackedUnit {
            id: "u1".to_string(),
            job_id: None,
        };
        let orphan = TrackedUnit {
            id: "u2".to_string(),
            job_id: Some(uuid::Uuid::new_v4()),
        };

        assert_eq!(derive_status(&[], None, &[]), BatchStatus::Empty);
        assert_eq!(
            derive_status(&[unassigned.clone()], None, &[]),
            BatchStatus::Uploading
        );

        let batch_id = uuid::Uuid::new_v4();
        let queued = JobRecord::sub(batch_id, PageRange::new(1, 10), "upload/doc.pdf");
        // A queued job outranks Pending even next to an unresolvable unit.
        assert_eq!(
            derive_status(&[orphan.clone()], None, std::slice::from_ref(&queued)),
            BatchStatus::Running
        );
        // An unassigned unit outranks a running job.
        assert_eq!(
            derive_status(&[unassigned], None, std::slice::from_ref(&queued)),
            BatchStatus::Uploading
        );

        let mut finished = queued;
        finished.apply(Transition::Start);
        finished.apply(Transition::Fail {
            error: "boom".to_string(),
        });
        assert_eq!(
            derive_status(&[orphan], None, std::slice::from_ref(&finished)),
            BatchStatus::Pending
        );
        let assigned = TrackedUnit {
            id: "u3".to_string(),
            job_id: Some(finished.id),
        };
        assert_eq!(
            derive_status(&[assigned], None, &[finished]),
            BatchStatus::Done
        );
    }

    #[test]
    fn non_terminal_master_keeps_batch_running() {
        let registry = Arc::new(JobRegistry::new());
        let (batch_id, subs) = seeded_batch(&registry);
        for id in subs {
            complete(&registry, id, 1);
        }

        let units = RegistryUnits::new(Arc::clone(&registry));
        let master = registry.get(batch_id);
        let jobs = registry.list_by_batch(batch_id);
        // All subs terminal but the master not yet consolidated.
        assert_eq!(
            derive_status(&units.tracked_units(batch_id), master.as_ref(), &jobs),
            BatchStatus::Running
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finished_batch_yields_one_done_frame() {
        let registry = Arc::new(JobRegistry::new());
        let (batch_id, subs) = seeded_batch(&registry);
        for id in subs {
            complete(&registry, id, 84);
        }
        registry.apply(batch_id, Transition::Start).unwrap();
        registry
            .apply(
                batch_id,
                Transition::Complete {
                    result_refs: Vec::new(),
                    units: 250,
                    message: String::new(),
                },
            )
            .unwrap();

        let units: Arc<dyn UnitSource> = Arc::new(RegistryUnits::new(Arc::clone(&registry)));
        let frames: Vec<BatchFrame> =
            batch_frames(Arc::clone(&registry), units, batch_id, fast_config())
                .collect()
                .await;

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.status, BatchStatus::Done);
        assert!(frame.finished);
        assert_eq!(frame.units_total, 3);
        assert_eq!(frame.units_done, 3);
        assert_eq!(frame.jobs.len(), 3);
        assert_eq!(frame.master.as_ref().unwrap().units_done, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_on_member_changes_until_done() {
        let registry = Arc::new(JobRegistry::new());
        let (batch_id, subs) = seeded_batch(&registry);
        let units: Arc<dyn UnitSource> = Arc::new(RegistryUnits::new(Arc::clone(&registry)));

        let mut stream = Box::pin(batch_frames(
            Arc::clone(&registry),
            units,
            batch_id,
            fast_config(),
        ));

        let first = stream.next().await.unwrap();
        assert_eq!(first.status, BatchStatus::Running);
        assert_eq!(first.units_done, 0);

        complete(&registry, subs[0], 84);
        let after_one = stream.next().await.unwrap();
        assert_eq!(after_one.status, BatchStatus::Running);
        assert_eq!(after_one.units_done, 1);

        complete(&registry, subs[1], 84);
        complete(&registry, subs[2], 82);
        let after_all_subs = stream.next().await.unwrap();
        // Still running: the master has not been consolidated.
        assert_eq!(after_all_subs.status, BatchStatus::Running);
        assert_eq!(after_all_subs.units_done, 3);

        registry.apply(batch_id, Transition::Start).unwrap();
        registry
            .apply(
                batch_id,
                Transition::Complete {
                    result_refs: Vec::new(),
                    units: 250,
                    message: String::new(),
                },
            )
            .unwrap();
        let done = stream.next().await.unwrap();
        assert_eq!(done.status, BatchStatus::Done);
        assert!(done.finished);
        assert!(stream.next().await.is_none());
    }

    /// Unit source simulating an upload tracker: one unit not yet
    /// submitted as a job.
    struct UploadTracker {
        assigned: Option<JobId>,
    }

    impl UnitSource for UploadTracker {
        fn tracked_units(&self, _batch_id: JobId) -> Vec<TrackedUnit> {
            vec![
                TrackedUnit {
                    id: "doc-1".to_string(),
                    job_id: self.assigned,
                },
                TrackedUnit {
                    id: "doc-2".to_string(),
                    job_id: None,
                },
            ]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unassigned_units_report_uploading() {
        let registry = Arc::new(JobRegistry::new());
        let units: Arc<dyn UnitSource> = Arc::new(UploadTracker { assigned: None });

        let mut stream = Box::pin(batch_frames(
            Arc::clone(&registry),
            units,
            uuid::Uuid::new_v4(),
            fast_config(),
        ));
        let frame = stream.next().await.unwrap();
        assert_eq!(frame.status, BatchStatus::Uploading);
        assert_eq!(frame.units_total, 2);
        assert!(!frame.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_batch_times_out_with_empty_frames() {
        let registry = Arc::new(JobRegistry::new());
        let units: Arc<dyn UnitSource> = Arc::new(RegistryUnits::new(Arc::clone(&registry)));

        let frames: Vec<BatchFrame> =
            batch_frames(registry, units, uuid::Uuid::new_v4(), fast_config())
                .collect()
                .await;
        assert!(frames.iter().all(|f| f.status == BatchStatus::Empty));
        assert!(frames.last().unwrap().timed_out);
    }
}
