use super::assembler::BatchAssembler;
use super::backpressure::BackpressureHandler;
use super::channel::{create_queue, QueueError, QueueProducer};
use super::committer::BatchCommitter;
use super::runner::run_worker;
use super::state::PipelineState;
use crate::config::parse::validate_pipeline;
use crate::config::types::PipelineConfig;
use crate::document::{Document, DocumentMapper, SolrDocumentMapper};
use crate::event::Event;
use crate::index::{IndexError, PingResponse, SearchIndex};
use crate::observe::{MetricsSnapshot, PipelineMetrics, PipelineObserver, TracingObserver};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors that cross the pipeline boundary.
///
/// Commit failures never appear here; they are absorbed by the worker and
/// reported through the observer and metrics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline is not running (state: {0})")]
    NotRunning(PipelineState),

    #[error("operation not allowed in state {0}")]
    InvalidState(PipelineState),

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("index is unreachable: {0}")]
    IndexUnreachable(#[source] IndexError),

    #[error("index did not answer the reachability probe within {0:?}")]
    ProbeTimeout(Duration),

    #[error("pipeline stopped while the event was waiting for queue space")]
    Cancelled,

    #[error("interrupted while waiting for queue space")]
    Interrupted,

    #[error("indexing queue is full")]
    QueueFull,

    #[error("indexing worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<QueueError> for PipelineError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Cancelled => PipelineError::Cancelled,
            QueueError::Full => PipelineError::QueueFull,
            QueueError::Interrupted => PipelineError::Interrupted,
        }
    }
}

/// Point-in-time view of a pipeline for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub state: PipelineState,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub metrics: MetricsSnapshot,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<usize>,
}

/// Asynchronous batched indexing pipeline.
///
/// Producers call [`submit`](Self::submit) from any task; a single background
/// worker batches the resulting documents and commits them to the index.
/// Only one worker exists per pipeline.
pub struct IndexingPipeline {
    config: PipelineConfig,
    index: Arc<dyn SearchIndex>,
    mapper: Arc<dyn DocumentMapper>,
    observer: Arc<dyn PipelineObserver>,
    metrics: Arc<PipelineMetrics>,
    state: watch::Sender<PipelineState>,
    producer: RwLock<Option<QueueProducer<Document>>>,
    // Also serializes start and stop
    worker: Mutex<Option<Worker>>,
}

impl IndexingPipeline {
    pub fn new(config: PipelineConfig, index: Arc<dyn SearchIndex>) -> Self {
        let (state, _) = watch::channel(PipelineState::Stopped);
        Self {
            config,
            index,
            mapper: Arc::new(SolrDocumentMapper),
            observer: Arc::new(TracingObserver),
            metrics: Arc::new(PipelineMetrics::new()),
            state,
            producer: RwLock::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn DocumentMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn stats(&self) -> PipelineStats {
        let (queue_depth, queue_capacity) = match self.read_producer().as_ref() {
            Some(producer) => (producer.depth(), producer.capacity()),
            None => (0, self.config.queue_capacity),
        };

        PipelineStats {
            state: self.state(),
            queue_depth,
            queue_capacity,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Verify the index is reachable, then start the worker.
    ///
    /// Fails without consuming anything if the config is invalid or the probe
    /// fails or times out; the pipeline stays `Stopped` and may be started
    /// again later.
    pub async fn start(&self) -> Result<PingResponse, PipelineError> {
        let mut worker = self.worker.lock().await;
        self.check_config()?;
        self.transition(PipelineState::Stopped, PipelineState::Verifying)
            .map_err(PipelineError::InvalidState)?;

        let probe_timeout = self.config.probe_timeout;
        let probe = match tokio::time::timeout(probe_timeout, self.index.ping()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.observer.probe_failed(&e);
                self.set_state(PipelineState::Stopped);
                return Err(PipelineError::IndexUnreachable(e));
            }
            Err(_) => {
                self.observer.probe_timed_out(probe_timeout);
                self.set_state(PipelineState::Stopped);
                return Err(PipelineError::ProbeTimeout(probe_timeout));
            }
        };
        self.observer.probe_succeeded(&probe);

        let cancel = CancellationToken::new();
        let (producer, consumer) = create_queue(
            self.config.queue_capacity,
            BackpressureHandler::from_config(&self.config.admission),
            cancel.clone(),
        );
        let assembler = BatchAssembler::new(
            consumer,
            self.config.batch_window,
            self.config.max_batch_size,
        );
        let committer = BatchCommitter::new(
            self.index.clone(),
            self.config.commit_within,
            self.config.retry.clone(),
            self.observer.clone(),
            self.metrics.clone(),
        )
        .with_cancellation(cancel.clone());
        let handle = tokio::spawn(run_worker(
            assembler,
            committer,
            self.observer.clone(),
            self.metrics.clone(),
        ));

        *worker = Some(Worker { cancel, handle });
        *self.write_producer() = Some(producer);
        self.set_state(PipelineState::Running);

        Ok(probe)
    }

    /// Cancel the worker and wait for it to exit.
    ///
    /// A commit already in flight runs to completion; documents still queued
    /// are discarded. Stopping a stopped pipeline is a no-op.
    pub async fn stop(&self) -> Result<(), PipelineError> {
        let mut worker = self.worker.lock().await;
        match self.transition(PipelineState::Running, PipelineState::Draining) {
            Ok(()) => {}
            Err(PipelineState::Stopped) => return Ok(()),
            Err(other) => return Err(PipelineError::InvalidState(other)),
        }

        self.write_producer().take();

        let result = match worker.take() {
            Some(Worker { cancel, handle }) => {
                cancel.cancel();
                handle.await.map(|_| ())
            }
            None => Ok(()),
        };

        self.set_state(PipelineState::Stopped);
        result.map_err(PipelineError::from)
    }

    /// Map an event to a document and hand it to the worker.
    ///
    /// Waits while the queue is full, according to the admission policy.
    pub async fn submit(&self, event: &Event) -> Result<(), PipelineError> {
        self.submit_until(event, None).await
    }

    /// Like [`submit`](Self::submit), but returns
    /// [`PipelineError::Interrupted`] if `interrupt` fires while waiting.
    pub async fn submit_interruptible(
        &self,
        event: &Event,
        interrupt: &CancellationToken,
    ) -> Result<(), PipelineError> {
        self.submit_until(event, Some(interrupt)).await
    }

    async fn submit_until(
        &self,
        event: &Event,
        interrupt: Option<&CancellationToken>,
    ) -> Result<(), PipelineError> {
        let state = self.state();
        if state != PipelineState::Running {
            return Err(PipelineError::NotRunning(state));
        }

        let producer = self.read_producer().clone();
        let producer = producer.ok_or_else(|| PipelineError::NotRunning(self.state()))?;

        let document = self.mapper.map(event);
        let result = match interrupt {
            Some(token) => producer.enqueue_interruptible(document, token).await,
            None => producer.enqueue(document).await,
        };

        match result {
            Ok(()) => {
                self.metrics.document_submitted();
                Ok(())
            }
            Err(e) => {
                self.metrics.admission_refused();
                self.observer.admission_refused(event.event_type(), &e);
                Err(e.into())
            }
        }
    }

    fn check_config(&self) -> Result<(), PipelineError> {
        let mut problems = Vec::new();
        validate_pipeline(&self.config, &mut problems);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::InvalidConfig(problems.join("; ")))
        }
    }

    fn transition(&self, from: PipelineState, to: PipelineState) -> Result<(), PipelineState> {
        let mut actual = from;
        let changed = self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                actual = *state;
                false
            }
        });

        if changed {
            self.observer.state_changed(from, to);
            Ok(())
        } else {
            Err(actual)
        }
    }

    fn set_state(&self, to: PipelineState) {
        let from = self.state.send_replace(to);
        if from != to {
            self.observer.state_changed(from, to);
        }
    }

    fn read_producer(&self) -> RwLockReadGuard<'_, Option<QueueProducer<Document>>> {
        self.producer.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_producer(&self) -> RwLockWriteGuard<'_, Option<QueueProducer<Document>>> {
        self.producer.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for IndexingPipeline {
    fn drop(&mut self) {
        // Don't leave a detached worker running
        if let Some(worker) = self.worker.get_mut().take() {
            worker.cancel.cancel();
        }
    }
}
