//! Pipeline runner coordinating selector, work queue, and worker pool.
//!
//! Every enrichment follows the same skeleton:
//! candidates are streamed from the store into a bounded queue, a fixed pool
//! of workers pulls descriptors off it, and each worker runs
//! fetch → transform → write → pace until the queue is closed and drained.
//! [`Pipeline::run`] only returns once every worker has exited.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::controls::PipelineControls;
use crate::error::{FetchError, PipelineError, StoreError};
use crate::job::{JobEvent, JobState, MovieId, ProviderKey, RecordDescriptor};
use crate::queue::{self, QueueConsumer, QueueError};
use crate::store::{CandidateStream, MovieStore, MovieUpdate};

/// One concrete enrichment: where candidates come from, how to fetch them,
/// and which columns the result maps to.
///
/// Each worker gets its own clone, so per-worker client state lives here.
#[async_trait]
pub trait Enrichment: Clone + Send + Sync + 'static {
    /// What the provider is queried with.
    type Key: ProviderKey;
    /// Decoded provider response.
    type Response: Send;

    /// Pipeline name used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Rows still missing this enrichment, most popular first.
    async fn candidates(
        &self,
        store: &dyn MovieStore,
    ) -> Result<CandidateStream<Self::Key>, StoreError>;

    /// One provider call. No retries.
    async fn fetch(&self, key: &Self::Key) -> Result<Self::Response, FetchError>;

    /// Pure mapping from response to column values.
    fn transform(&self, response: Self::Response) -> MovieUpdate;
}

/// Sink for per-job terminal events.
pub trait JobObserver: Send + Sync {
    /// Called once per job when it reaches a terminal state.
    fn on_job(&self, event: &JobEvent);
}

/// Default observer: one structured log line per job.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_job(&self, event: &JobEvent) {
        let elapsed_ms = event.elapsed.as_millis() as u64;
        if event.is_done() {
            info!(
                pipeline = event.pipeline,
                worker = event.worker_id,
                movie_id = event.movie_id,
                key = %event.key,
                outcome = %event.state,
                elapsed_ms,
                detail = event.detail.as_deref().unwrap_or(""),
                "job done"
            );
        } else {
            warn!(
                pipeline = event.pipeline,
                worker = event.worker_id,
                movie_id = event.movie_id,
                key = %event.key,
                outcome = %event.state,
                elapsed_ms,
                error = event.detail.as_deref().unwrap_or(""),
                "job failed"
            );
        }
    }
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events seen so far.
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl JobObserver for RecordingObserver {
    fn on_job(&self, event: &JobEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Aggregate outcome of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Pipeline name.
    pub pipeline: &'static str,
    /// Descriptors handed to the queue.
    pub queued: usize,
    /// Jobs that reached `done`.
    pub done: usize,
    /// Jobs that ended in `fetch_failed`.
    pub fetch_failed: usize,
    /// Jobs that ended in `write_failed`.
    pub write_failed: usize,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl PipelineSummary {
    fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            ..Self::default()
        }
    }

    /// Jobs that ended in any failure state.
    pub fn failed(&self) -> usize {
        self.fetch_failed + self.write_failed
    }

    /// Jobs that reached any terminal state.
    pub fn finished(&self) -> usize {
        self.done + self.failed()
    }

    fn absorb(&mut self, tally: WorkerTally) {
        self.done += tally.done;
        self.fetch_failed += tally.fetch_failed;
        self.write_failed += tally.write_failed;
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: queued={} done={} fetch_failed={} write_failed={} elapsed={:.1}s",
            self.pipeline,
            self.queued,
            self.done,
            self.fetch_failed,
            self.write_failed,
            self.elapsed.as_secs_f64()
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct WorkerTally {
    done: usize,
    fetch_failed: usize,
    write_failed: usize,
}

impl WorkerTally {
    fn record(&mut self, state: JobState) {
        match state {
            JobState::Done => self.done += 1,
            JobState::FetchFailed => self.fetch_failed += 1,
            JobState::WriteFailed => self.write_failed += 1,
            other => debug_assert!(other.is_terminal(), "job ended in {other}"),
        }
    }
}

/// Driver owning the store handle, the controls, and the enrichment.
pub struct Pipeline<E: Enrichment> {
    enrichment: E,
    store: Arc<dyn MovieStore>,
    controls: PipelineControls,
    observer: Arc<dyn JobObserver>,
}

impl<E: Enrichment> Pipeline<E> {
    /// Builds a pipeline that logs each job through `tracing`.
    pub fn new(enrichment: E, store: Arc<dyn MovieStore>, controls: PipelineControls) -> Self {
        Self {
            enrichment,
            store,
            controls,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the per-job event sink.
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs to completion: every candidate reaches a terminal state and every
    /// worker has returned before this resolves.
    ///
    /// Per-job failures are counted, never returned. Only a failed candidate
    /// query or a crashed worker is an error.
    pub async fn run(self) -> Result<PipelineSummary, PipelineError> {
        let started = Instant::now();
        let name = self.enrichment.name();
        let workers = self.controls.workers();
        let (producer, consumer) = queue::bounded(self.controls.queue_capacity());
        info!(
            pipeline = name,
            workers,
            queue_capacity = producer.capacity(),
            pacing_ms = self.controls.pacing_delay().as_millis() as u64,
            "starting pipeline"
        );

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    pipeline: name,
                    enrichment: self.enrichment.clone(),
                    store: Arc::clone(&self.store),
                    queue: consumer.clone(),
                    observer: Arc::clone(&self.observer),
                    pacing: self.controls.pacing_delay(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(consumer);

        let mut summary = PipelineSummary::new(name);
        let selection = self.enrichment.candidates(self.store.as_ref()).await;
        let fatal = match selection {
            Ok(mut candidates) => {
                while let Some(descriptor) = candidates.next().await {
                    if let Err(QueueError::Disconnected(orphan)) = producer.push(descriptor).await {
                        warn!(
                            pipeline = name,
                            movie_id = orphan.movie_id,
                            "no workers left; stopping selection"
                        );
                        break;
                    }
                    summary.queued += 1;
                }
                info!(pipeline = name, queued = summary.queued, "all candidates queued");
                None
            }
            Err(err) => Some(PipelineError::Selection(err)),
        };
        producer.close();

        let mut crashed = None;
        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(tally) => summary.absorb(tally),
                Err(err) => {
                    warn!(pipeline = name, worker = worker_id, error = %err, "worker crashed");
                    crashed.get_or_insert(PipelineError::Worker {
                        worker_id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        summary.elapsed = started.elapsed();

        if let Some(err) = fatal.or(crashed) {
            return Err(err);
        }
        info!(
            pipeline = name,
            queued = summary.queued,
            done = summary.done,
            fetch_failed = summary.fetch_failed,
            write_failed = summary.write_failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "pipeline complete"
        );
        Ok(summary)
    }
}

struct Worker<E: Enrichment> {
    id: usize,
    pipeline: &'static str,
    enrichment: E,
    store: Arc<dyn MovieStore>,
    queue: QueueConsumer<RecordDescriptor<E::Key>>,
    observer: Arc<dyn JobObserver>,
    pacing: Duration,
}

impl<E: Enrichment> Worker<E> {
    async fn run(self) -> WorkerTally {
        let mut tally = WorkerTally::default();
        while let Some(descriptor) = self.queue.next_task().await {
            tally.record(self.process(descriptor).await);
        }
        debug!(pipeline = self.pipeline, worker = self.id, "worker drained");
        tally
    }

    async fn process(&self, descriptor: RecordDescriptor<E::Key>) -> JobState {
        let started = Instant::now();
        let RecordDescriptor { movie_id, key } = descriptor;
        let mut state = JobState::Queued.advance();
        self.trace(movie_id, state);

        let response = match self.enrichment.fetch(&key).await {
            Ok(response) => response,
            Err(err) => {
                let failed = state.fail().unwrap_or(JobState::FetchFailed);
                self.emit(movie_id, &key, failed, Some(err.to_string()), started);
                return failed;
            }
        };
        state = state.advance();
        self.trace(movie_id, state);

        state = state.advance();
        let update = self.enrichment.transform(response);
        state = state.advance();
        self.trace(movie_id, state);

        let (state, detail) = match self.store.apply(movie_id, &update).await {
            Ok(()) => (state.advance(), update.label()),
            Err(err) => (
                state.fail().unwrap_or(JobState::WriteFailed),
                Some(err.to_string()),
            ),
        };
        self.emit(movie_id, &key, state, detail, started);

        if !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }
        state
    }

    fn trace(&self, movie_id: MovieId, state: JobState) {
        trace!(
            pipeline = self.pipeline,
            worker = self.id,
            movie_id,
            state = %state,
            "job state"
        );
    }

    fn emit(
        &self,
        movie_id: MovieId,
        key: &E::Key,
        state: JobState,
        detail: Option<String>,
        started: Instant,
    ) {
        let event = JobEvent {
            pipeline: self.pipeline,
            worker_id: self.id,
            movie_id,
            key: key.log_key(),
            state,
            detail,
            elapsed: started.elapsed(),
        };
        self.observer.on_job(&event);
    }
}
