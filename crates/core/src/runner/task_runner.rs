//! Bounded worker pool over a batch of units.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::events::{BatchEvent, EventHandle};
use crate::metrics;
use crate::pipeline::UnitPipeline;
use crate::unit::UnitOutcome;

use super::types::{BatchReport, ReportEntry, RunnerError, RunnerStatus};

#[derive(Default)]
struct RunnerStats {
    active: AtomicUsize,
    queued: AtomicUsize,
    completed: AtomicUsize,
}

/// State shared by the workers of one batch.
struct Batch {
    queue: Mutex<VecDeque<(usize, String)>>,
    entries: Mutex<Vec<(usize, ReportEntry)>>,
}

/// Runs the unit pipeline for many units with at most `concurrency` in
/// flight.
///
/// Workers pull ids from one shared queue, so a slow unit never holds up
/// units assigned to other workers. A unit's failure, including a panic
/// inside its pipeline, is recorded in the report and never stops the batch.
pub struct TaskRunner {
    concurrency: usize,
    pipeline: Arc<UnitPipeline>,
    events: Option<EventHandle>,
    config_hash: Option<String>,
    running: AtomicBool,
    stopping: AtomicBool,
    stats: RunnerStats,
}

impl TaskRunner {
    pub fn new(concurrency: usize, pipeline: Arc<UnitPipeline>) -> Self {
        Self {
            concurrency,
            pipeline,
            events: None,
            config_hash: None,
            running: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            stats: RunnerStats::default(),
        }
    }

    /// Sets the handle progress events are emitted through.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    /// Records the configuration fingerprint in the batch-started event.
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Stops dispatching new units.
    ///
    /// Units already in flight run to completion; units still queued are
    /// recorded as `NotStarted`. Shutdown is permanent for this runner.
    pub fn shutdown(&self) {
        if !self.stopping.swap(true, Ordering::SeqCst) {
            info!("Runner shutting down, no further units will be dispatched");
        }
    }

    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            running: self.running.load(Ordering::SeqCst),
            active: self.stats.active.load(Ordering::SeqCst),
            queued: self.stats.queued.load(Ordering::SeqCst),
            completed: self.stats.completed.load(Ordering::SeqCst),
        }
    }

    /// Processes every unit and returns once each has an outcome.
    ///
    /// Returns an error only when the batch cannot start.
    pub async fn submit(&self, unit_ids: Vec<String>) -> Result<BatchReport, RunnerError> {
        if self.concurrency == 0 {
            return Err(RunnerError::InvalidConcurrency(self.concurrency));
        }
        let mut seen = HashSet::new();
        for id in &unit_ids {
            if !seen.insert(id.as_str()) {
                return Err(RunnerError::DuplicateUnit(id.clone()));
            }
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RunnerError::AlreadyRunning);
        }

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = unit_ids.len();
        info!(
            "Starting batch {} with {} units, concurrency {}",
            batch_id, total, self.concurrency
        );
        self.emit(BatchEvent::BatchStarted {
            batch_id: batch_id.to_string(),
            units: total,
            concurrency: self.concurrency,
            config_hash: self.config_hash.clone(),
        })
        .await;

        self.stats.completed.store(0, Ordering::SeqCst);
        self.stats.queued.store(total, Ordering::SeqCst);
        let batch = Batch {
            queue: Mutex::new(unit_ids.into_iter().enumerate().collect()),
            entries: Mutex::new(Vec::with_capacity(total)),
        };

        let workers = self.concurrency.min(total.max(1));
        join_all((0..workers).map(|worker| self.worker(worker, &batch))).await;

        let Batch { queue, entries } = batch;
        let mut entries = entries.into_inner();
        let leftover = queue.into_inner();
        if !leftover.is_empty() {
            warn!("{} units were not started", leftover.len());
        }
        for (index, unit) in leftover {
            metrics::UNITS_TOTAL
                .with_label_values(&[UnitOutcome::NotStarted.label()])
                .inc();
            entries.push((
                index,
                ReportEntry {
                    unit,
                    outcome: UnitOutcome::NotStarted,
                    elapsed_secs: 0.0,
                },
            ));
        }
        self.stats.queued.store(0, Ordering::SeqCst);

        entries.sort_by_key(|(index, _)| *index);
        let report = BatchReport::new(
            batch_id,
            started_at,
            self.concurrency,
            entries.into_iter().map(|(_, entry)| entry).collect(),
        );

        let counts = report.counts;
        info!(
            "Batch {} finished: {} succeeded, {} rejected, {} failed, {} not started",
            batch_id, counts.succeeded, counts.rejected, counts.failed, counts.not_started
        );
        self.emit(BatchEvent::BatchFinished {
            batch_id: batch_id.to_string(),
            succeeded: counts.succeeded,
            rejected: counts.rejected,
            failed: counts.failed,
            not_started: counts.not_started,
        })
        .await;

        self.running.store(false, Ordering::SeqCst);
        Ok(report)
    }

    async fn worker(&self, worker: usize, batch: &Batch) {
        debug!("Worker {} started", worker);
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            let next = batch.queue.lock().await.pop_front();
            let Some((index, unit)) = next else {
                break;
            };
            self.stats.queued.fetch_sub(1, Ordering::SeqCst);

            let entry = self.process(unit).await;
            batch.entries.lock().await.push((index, entry));
            self.stats.completed.fetch_add(1, Ordering::SeqCst);
        }
        debug!("Worker {} exiting", worker);
    }

    async fn process(&self, unit: String) -> ReportEntry {
        self.stats.active.fetch_add(1, Ordering::SeqCst);
        metrics::UNITS_IN_FLIGHT.inc();
        debug!("Started {}", unit);
        self.emit(BatchEvent::UnitStarted { unit: unit.clone() })
            .await;

        let start = Instant::now();
        let pipeline = self.pipeline.clone();
        let id = unit.clone();
        let outcome = match tokio::spawn(async move { pipeline.execute(&id).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Pipeline for {} did not complete: {}", unit, e);
                UnitOutcome::Failed(join_failure(e))
            }
        };
        let elapsed = start.elapsed().as_secs_f64();

        match &outcome {
            UnitOutcome::Succeeded => debug!("Finished {}", unit),
            other => warn!("{}: {}", unit, other),
        }
        metrics::UNITS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        metrics::UNIT_DURATION
            .with_label_values(&[outcome.label()])
            .observe(elapsed);
        metrics::UNITS_IN_FLIGHT.dec();
        self.stats.active.fetch_sub(1, Ordering::SeqCst);

        self.emit(BatchEvent::UnitFinished {
            unit: unit.clone(),
            outcome: outcome.clone(),
            elapsed_secs: elapsed,
        })
        .await;

        ReportEntry {
            unit,
            outcome,
            elapsed_secs: elapsed,
        }
    }

    async fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            events.emit(event).await;
        }
    }
}

fn join_failure(e: JoinError) -> String {
    if !e.is_panic() {
        return "pipeline cancelled".to_string();
    }
    let payload = e.into_panic();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("pipeline panicked: {}", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::{create_event_system, MemorySink};
    use crate::store::MemoryCompletionStore;
    use crate::testing::{MockInspector, MockToolAdapter};
    use crate::tool::ToolOperation;
    use std::time::Duration;

    struct Harness {
        _dir: tempfile::TempDir,
        pipeline: Arc<UnitPipeline>,
        adapter: Arc<MockToolAdapter>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.runner.archive_root = dir.path().to_path_buf();

        let adapter = Arc::new(MockToolAdapter::new());
        let pipeline = Arc::new(UnitPipeline::new(
            &config,
            Arc::new(MemoryCompletionStore::new()),
            adapter.clone(),
            Arc::new(MockInspector::new()),
        ));
        Harness {
            _dir: dir,
            pipeline,
            adapter,
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_every_unit_gets_one_entry_in_order() {
        let h = harness();
        let runner = TaskRunner::new(3, h.pipeline.clone());

        let report = runner.submit(ids(7)).await.unwrap();
        let units: Vec<_> = report.entries.iter().map(|e| e.unit.clone()).collect();
        assert_eq!(units, ids(7));
        assert_eq!(report.counts.succeeded, 7);
        assert!(!runner.status().running);
        assert_eq!(runner.status().completed, 7);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let h = harness();
        let runner = TaskRunner::new(2, h.pipeline.clone());
        let report = runner.submit(vec![]).await.unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let h = harness();
        let runner = TaskRunner::new(0, h.pipeline.clone());
        let err = runner.submit(ids(1)).await.unwrap_err();
        assert!(matches!(err, RunnerError::InvalidConcurrency(0)));
        assert!(h.adapter.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_unit_rejected_before_start() {
        let h = harness();
        let runner = TaskRunner::new(2, h.pipeline.clone());
        let err = runner
            .submit(vec!["1".into(), "2".into(), "1".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::DuplicateUnit(ref id) if id == "1"));
        assert!(h.adapter.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_cap_respected() {
        let h = harness();
        h.adapter.set_duration(Duration::from_millis(30)).await;
        let runner = TaskRunner::new(3, h.pipeline.clone());

        let report = runner.submit(ids(8)).await.unwrap();
        assert_eq!(report.counts.succeeded, 8);
        assert_eq!(h.adapter.peak_concurrency(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_contained() {
        let h = harness();
        h.adapter.fail_for("2", ToolOperation::Reprocess).await;
        let runner = TaskRunner::new(2, h.pipeline.clone());

        let report = runner.submit(ids(4)).await.unwrap();
        assert!(matches!(report.get("2"), Some(UnitOutcome::Failed(_))));
        assert_eq!(report.counts.succeeded, 3);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let h = harness();
        h.adapter.panic_for("2").await;
        let runner = TaskRunner::new(2, h.pipeline.clone());

        let report = runner.submit(ids(3)).await.unwrap();
        match report.get("2") {
            Some(UnitOutcome::Failed(message)) => {
                assert!(message.starts_with("pipeline panicked"));
                assert!(message.contains("simulated tool crash"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.counts.succeeded, 2);
        assert_eq!(runner.status().active, 0);
    }

    #[tokio::test]
    async fn test_shutdown_records_not_started() {
        let h = harness();
        h.adapter.set_duration(Duration::from_millis(40)).await;
        let runner = Arc::new(TaskRunner::new(1, h.pipeline.clone()));

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.submit(ids(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        runner.shutdown();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.len(), 5);
        assert_eq!(report.get("1"), Some(&UnitOutcome::Succeeded));
        for id in ["2", "3", "4", "5"] {
            assert_eq!(report.get(id), Some(&UnitOutcome::NotStarted));
        }
        assert!(h.adapter.invocations_for("2").await.is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_running() {
        let h = harness();
        h.adapter.set_duration(Duration::from_millis(30)).await;
        let runner = Arc::new(TaskRunner::new(1, h.pipeline.clone()));

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.submit(ids(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(runner.status().running);
        let err = runner.submit(vec!["9".into()]).await.unwrap_err();
        assert!(matches!(err, RunnerError::AlreadyRunning));

        assert_eq!(task.await.unwrap().unwrap().counts.succeeded, 2);
    }

    #[tokio::test]
    async fn test_events_start_before_finish() {
        let h = harness();
        let sink = MemorySink::new();
        let (handle, writer) = create_event_system(vec![Arc::new(sink.clone())], 64);
        let writer_task = tokio::spawn(writer.run());

        let runner = TaskRunner::new(2, h.pipeline.clone())
            .with_events(handle)
            .with_config_hash("abc");
        runner.submit(ids(4)).await.unwrap();
        drop(runner);
        writer_task.await.unwrap();

        let events = sink.events();
        assert_eq!(events.first().unwrap().event_type(), "batch_started");
        assert_eq!(events.last().unwrap().event_type(), "batch_finished");
        for id in ids(4) {
            let started = events
                .iter()
                .position(|e| matches!(e, BatchEvent::UnitStarted { unit } if *unit == id))
                .unwrap();
            let finished = events
                .iter()
                .position(|e| matches!(e, BatchEvent::UnitFinished { unit, .. } if *unit == id))
                .unwrap();
            assert!(started < finished);
        }
    }
}
