//! Runs a single concatenation as a traceable unit of work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{EventHandle, JobEvent, JobOutcome};
use crate::concat::{ConcatJob, ConcatResult, Concatenator};
use crate::error::MergeError;
use crate::metrics::{MERGE_DURATION, MERGE_JOBS_TOTAL};

/// Result of a successful job run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub run_id: u64,
    pub result: ConcatResult,
}

/// Wraps a [`Concatenator`] with run ids, lifecycle events and metrics.
pub struct JobRunner<C: Concatenator + ?Sized> {
    concatenator: Arc<C>,
    events: Option<EventHandle>,
    next_run_id: AtomicU64,
}

impl<C: Concatenator + ?Sized> JobRunner<C> {
    pub fn new(concatenator: Arc<C>) -> Self {
        Self {
            concatenator,
            events: None,
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Sets the event handle for lifecycle events.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    pub fn concatenator(&self) -> &C {
        &self.concatenator
    }

    /// Runs the job. The completion event is emitted whatever the outcome
    /// and carries it; errors are returned to the caller unchanged.
    pub async fn run(
        &self,
        mut job: ConcatJob,
        cancel: &CancellationToken,
    ) -> Result<JobReport, MergeError> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        job.run_id = run_id;
        let start = Instant::now();

        self.emit(JobEvent::Started {
            run_id,
            workspace: job.workspace_dir.clone(),
            input_count: job.inputs.len(),
        })
        .await;

        let result = self.concatenator.concat(&job, cancel).await;

        let outcome = match &result {
            Ok(r) => JobOutcome::Succeeded {
                output_path: r.output_path.clone(),
                output_size_bytes: r.output_size_bytes,
            },
            Err(e) => JobOutcome::failed(e),
        };

        let elapsed = start.elapsed();
        MERGE_JOBS_TOTAL.with_label_values(&[outcome.label()]).inc();
        MERGE_DURATION
            .with_label_values(&[outcome.label()])
            .observe(elapsed.as_secs_f64());

        self.emit(JobEvent::Completed {
            run_id,
            outcome,
            duration_ms: elapsed.as_millis() as u64,
        })
        .await;

        result.map(|result| JobReport { run_id, result })
    }

    async fn emit(&self, event: JobEvent) {
        if let Some(ref events) = self.events {
            events.emit(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::create_event_system;
    use crate::testing::MockConcatenator;
    use tempfile::TempDir;

    fn job(dir: &TempDir) -> ConcatJob {
        let inputs: Vec<_> = ["a.mp4", "b.mp4", "c.mp4"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect();
        ConcatJob::new(dir.path(), inputs, "merged_video.mp4")
    }

    #[tokio::test]
    async fn test_run_ids_increase_monotonically() {
        let dir = TempDir::new().unwrap();
        let runner = JobRunner::new(Arc::new(MockConcatenator::new()));
        let cancel = CancellationToken::new();

        let first = runner.run(job(&dir), &cancel).await.unwrap();
        let second = runner.run(job(&dir), &cancel).await.unwrap();
        let third = runner.run(job(&dir), &cancel).await.unwrap();

        assert_eq!(first.run_id, 1);
        assert_eq!(second.run_id, 2);
        assert_eq!(third.run_id, 3);
    }

    #[tokio::test]
    async fn test_run_passes_run_id_to_concatenator() {
        let dir = TempDir::new().unwrap();
        let concatenator = Arc::new(MockConcatenator::new());
        let runner = JobRunner::new(Arc::clone(&concatenator));

        runner.run(job(&dir), &CancellationToken::new()).await.unwrap();

        let jobs = concatenator.recorded_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].run_id, 1);
    }

    #[tokio::test]
    async fn test_success_emits_started_and_completed() {
        let dir = TempDir::new().unwrap();
        let (handle, writer, recent) = create_event_system(16, 16);
        let task = tokio::spawn(writer.run());
        let runner = JobRunner::new(Arc::new(MockConcatenator::new())).with_events(handle);

        let report = runner.run(job(&dir), &CancellationToken::new()).await.unwrap();
        assert_eq!(report.result.output_size_bytes, 15);
        drop(runner);
        task.await.unwrap();

        let events = recent.snapshot().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].event,
            JobEvent::Started {
                run_id: 1,
                input_count: 3,
                ..
            }
        ));
        match &events[1].event {
            JobEvent::Completed { outcome, .. } => assert!(outcome.is_success()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_is_propagated_and_reported() {
        let dir = TempDir::new().unwrap();
        let (handle, writer, recent) = create_event_system(16, 16);
        let task = tokio::spawn(writer.run());
        let concatenator = Arc::new(MockConcatenator::new());
        concatenator
            .set_next_error(MergeError::processing(Some(1), Some("boom".to_string())))
            .await;
        let runner = JobRunner::new(concatenator).with_events(handle);

        let err = runner.run(job(&dir), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, MergeError::Processing { exit_code: Some(1), .. }));

        drop(runner);
        task.await.unwrap();

        let events = recent.snapshot().await;
        match &events[1].event {
            JobEvent::Completed { outcome, .. } => {
                assert_eq!(outcome.label(), "processing");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
