//! Completion poller: a finite stream of status events for one job.
//!
//! Each call to [`CompletionPoller::next_event`] waits one interval, reads
//! the job record and yields at most one event. The stream ends after the
//! first terminal event, or immediately when the cancellation token fires.
//! A poller is never restarted; poll a job again by building a new one.

use std::sync::Arc;
use std::time::Duration;

use texgen_core::generation::{Artifacts, JobStatus, PreviewSet};
use texgen_core::types::DbId;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::records::JobRecords;

/// One observation of a polled job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// New preview artifacts appeared. Polling continues.
    Preview(PreviewSet),
    /// The job completed; carries the full artifact set.
    Completed(Artifacts),
    /// The job failed with the stored error message.
    Failed(String),
    /// The job record disappeared.
    Vanished,
    /// The ceiling elapsed without a terminal state.
    Timeout { elapsed: Duration },
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEvent::Preview(_))
    }
}

pub struct CompletionPoller {
    records: Arc<dyn JobRecords>,
    job_id: DbId,
    interval: Duration,
    ceiling: Duration,
    cancel: CancellationToken,
    started: Instant,
    last_previews: PreviewSet,
    finished: bool,
}

impl CompletionPoller {
    pub fn new(
        records: Arc<dyn JobRecords>,
        job_id: DbId,
        interval: Duration,
        ceiling: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            records,
            job_id,
            interval,
            ceiling,
            cancel,
            started: Instant::now(),
            last_previews: PreviewSet::default(),
            finished: false,
        }
    }

    pub fn job_id(&self) -> DbId {
        self.job_id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the stream has ended, either after a terminal
    /// event or because the poller was cancelled.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        while !self.finished {
            let elapsed = self.started.elapsed();
            if elapsed >= self.ceiling {
                return self.finish(PollEvent::Timeout { elapsed });
            }

            let wait = self.interval.min(self.ceiling - elapsed);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.finished = true;
                    return None;
                }
                _ = tokio::time::sleep(wait) => {}
            }
            if self.started.elapsed() >= self.ceiling {
                continue;
            }

            let record = match self.records.fetch(self.job_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(job_id = %self.job_id, error = %e, "Poll failed, retrying next tick");
                    continue;
                }
            };
            // A cancel that raced the fetch wins.
            if self.cancel.is_cancelled() {
                self.finished = true;
                return None;
            }

            let Some(record) = record else {
                return self.finish(PollEvent::Vanished);
            };

            match record.status {
                JobStatus::Completed => return self.finish(PollEvent::Completed(record.artifacts)),
                JobStatus::Failed => {
                    let message = record
                        .error_message
                        .unwrap_or_else(|| "Generation failed".to_string());
                    return self.finish(PollEvent::Failed(message));
                }
                JobStatus::Processing => {
                    let previews = record.artifacts.previews;
                    if !previews.is_empty() && previews != self.last_previews {
                        self.last_previews = previews.clone();
                        return Some(PollEvent::Preview(previews));
                    }
                }
            }
        }
        None
    }

    fn finish(&mut self, event: PollEvent) -> Option<PollEvent> {
        self.finished = true;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use texgen_core::generation::TextureSet;

    use super::*;
    use crate::records::{JobRecord, RecordsError};

    /// Replays scripted fetch results; repeats the last one forever.
    struct Scripted {
        script: Mutex<VecDeque<Result<Option<JobStatusStep>, ()>>>,
        last: Mutex<Option<Result<Option<JobStatusStep>, ()>>>,
        fetches: Mutex<usize>,
    }

    #[derive(Clone)]
    struct JobStatusStep {
        status: JobStatus,
        previews: PreviewSet,
    }

    impl Scripted {
        fn new(steps: Vec<Result<Option<JobStatusStep>, ()>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into()),
                last: Mutex::new(None),
                fetches: Mutex::new(0),
            })
        }

        fn fetches(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    fn processing(previews: PreviewSet) -> Result<Option<JobStatusStep>, ()> {
        Ok(Some(JobStatusStep {
            status: JobStatus::Processing,
            previews,
        }))
    }

    fn status(status: JobStatus) -> Result<Option<JobStatusStep>, ()> {
        Ok(Some(JobStatusStep {
            status,
            previews: PreviewSet::default(),
        }))
    }

    #[async_trait]
    impl JobRecords for Scripted {
        async fn fetch(&self, job_id: DbId) -> Result<Option<JobRecord>, RecordsError> {
            *self.fetches.lock().unwrap() += 1;
            let step = {
                let mut script = self.script.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(next) = script.pop_front() {
                    *last = Some(next.clone());
                    next
                } else {
                    last.clone().unwrap_or_else(|| status(JobStatus::Processing))
                }
            };
            match step {
                Err(()) => Err(RecordsError::Corrupt("flaky".into())),
                Ok(None) => Ok(None),
                Ok(Some(s)) => Ok(Some(JobRecord {
                    id: job_id,
                    owner: DbId::nil(),
                    status: s.status,
                    high_quality: false,
                    upgrade_of: None,
                    artifacts: Artifacts {
                        textures: TextureSet {
                            diffuse: (s.status == JobStatus::Completed).then(|| "d.png".into()),
                            ..Default::default()
                        },
                        previews: s.previews,
                    },
                    error_message: (s.status == JobStatus::Failed).then(|| "out of memory".into()),
                    created_at: chrono::Utc::now(),
                })),
            }
        }

        async fn mark_failed(&self, _: DbId, _: &str) -> Result<bool, RecordsError> {
            Ok(true)
        }

        async fn fail_all_processing(&self, _: &str) -> Result<u64, RecordsError> {
            Ok(0)
        }

        async fn history(&self, _: DbId, _: i64) -> Result<Vec<JobRecord>, RecordsError> {
            Ok(Vec::new())
        }
    }

    const INTERVAL: Duration = Duration::from_secs(10);

    fn poller(records: Arc<Scripted>, ceiling: Duration) -> (CompletionPoller, CancellationToken) {
        let cancel = CancellationToken::new();
        let p = CompletionPoller::new(records, DbId::new_v4(), INTERVAL, ceiling, cancel.clone());
        (p, cancel)
    }

    fn depth(path: &str) -> PreviewSet {
        PreviewSet {
            depth: Some(path.into()),
            front: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_ends_stream() {
        let records = Scripted::new(vec![
            status(JobStatus::Processing),
            status(JobStatus::Completed),
        ]);
        let (mut p, _) = poller(records.clone(), Duration::from_secs(600));

        let start = Instant::now();
        let event = p.next_event().await.unwrap();
        assert_matches!(event, PollEvent::Completed(a) if a.textures.diffuse.as_deref() == Some("d.png"));
        assert_eq!(start.elapsed(), INTERVAL * 2);
        assert!(p.next_event().await.is_none());
        assert_eq!(records.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_carries_error_message() {
        let records = Scripted::new(vec![status(JobStatus::Failed)]);
        let (mut p, _) = poller(records, Duration::from_secs(600));
        assert_eq!(
            p.next_event().await,
            Some(PollEvent::Failed("out of memory".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn previews_surface_once_per_change() {
        let records = Scripted::new(vec![
            processing(depth("p1.png")),
            processing(depth("p1.png")),
            processing(depth("p2.png")),
            status(JobStatus::Completed),
        ]);
        let (mut p, _) = poller(records, Duration::from_secs(600));

        assert_eq!(p.next_event().await, Some(PollEvent::Preview(depth("p1.png"))));
        assert_eq!(p.next_event().await, Some(PollEvent::Preview(depth("p2.png"))));
        assert_matches!(p.next_event().await, Some(PollEvent::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_record_is_vanished() {
        let records = Scripted::new(vec![status(JobStatus::Processing), Ok(None)]);
        let (mut p, _) = poller(records, Duration::from_secs(600));
        assert_eq!(p.next_event().await, Some(PollEvent::Vanished));
        assert!(p.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_retried() {
        let records = Scripted::new(vec![Err(()), Err(()), status(JobStatus::Completed)]);
        let (mut p, _) = poller(records.clone(), Duration::from_secs(600));
        assert_matches!(p.next_event().await, Some(PollEvent::Completed(_)));
        assert_eq!(records.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out_exactly_once() {
        let records = Scripted::new(vec![]);
        let ceiling = Duration::from_secs(95);
        let (mut p, _) = poller(records, ceiling);

        let event = p.next_event().await.unwrap();
        assert_matches!(event, PollEvent::Timeout { elapsed } if elapsed >= ceiling);
        assert!(p.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_ticks_emits_nothing() {
        let records = Scripted::new(vec![]);
        let (mut p, cancel) = poller(records.clone(), Duration::from_secs(600));

        let handle = tokio::spawn(async move { p.next_event().await });
        tokio::time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();

        assert!(handle.await.unwrap().is_none());
        assert_eq!(records.fetches(), 2);
    }
}
