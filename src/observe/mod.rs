pub mod metrics;

pub use metrics::{MetricsSnapshot, PipelineMetrics};

use crate::event::EventType;
use crate::index::{IndexError, PingResponse};
use crate::pipeline::{CommitOutcome, PipelineState, QueueError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receives lifecycle and commit notifications from a pipeline.
///
/// Injected into the pipeline rather than reached through global state, so
/// several pipelines can report to different sinks. All methods default to
/// doing nothing.
pub trait PipelineObserver: Send + Sync {
    fn state_changed(&self, _from: PipelineState, _to: PipelineState) {}

    fn probe_succeeded(&self, _response: &PingResponse) {}

    fn probe_failed(&self, _error: &IndexError) {}

    fn probe_timed_out(&self, _timeout: Duration) {}

    fn worker_started(&self) {}

    /// `discarded` counts documents still queued when the worker exited
    fn worker_stopped(&self, _discarded: usize) {}

    fn commit_retrying(&self, _attempt: u32, _backoff: Duration, _cause: &str) {}

    fn commit_finished(&self, _outcome: &CommitOutcome) {}

    fn admission_refused(&self, _event_type: EventType, _error: &QueueError) {}
}

/// Observer that reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn state_changed(&self, from: PipelineState, to: PipelineState) {
        debug!(from = %from, to = %to, "Pipeline state changed");
    }

    fn probe_succeeded(&self, response: &PingResponse) {
        info!(
            latency_ms = response.latency.as_millis() as u64,
            qtime_ms = response.qtime,
            "Index location verified"
        );
    }

    fn probe_failed(&self, error: &IndexError) {
        error!(error = %error, "Ping failed. Verify that the index is available.");
    }

    fn probe_timed_out(&self, timeout: Duration) {
        error!(
            timeout_ms = timeout.as_millis() as u64,
            "Ping timed out. Verify that the index is available."
        );
    }

    fn worker_started(&self) {
        info!("Indexing worker started");
    }

    fn worker_stopped(&self, discarded: usize) {
        if discarded > 0 {
            warn!(discarded = discarded, "Indexing worker stopped, queued documents discarded");
        } else {
            info!("Indexing worker stopped");
        }
    }

    fn commit_retrying(&self, attempt: u32, backoff: Duration, cause: &str) {
        warn!(
            attempt = attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %cause,
            "Batch commit failed, retrying"
        );
    }

    fn commit_finished(&self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Success { documents, elapsed } => {
                debug!(
                    count = documents,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Indexed batch"
                );
            }
            CommitOutcome::IndexRejected { status, documents } => {
                warn!(status = status, count = documents, "Bad response code indexing documents");
            }
            CommitOutcome::TransportFailure { cause, documents } => {
                error!(error = %cause, count = documents, "Failed to reach index, batch dropped");
            }
            CommitOutcome::UnexpectedFailure { cause, documents } => {
                error!(error = %cause, count = documents, "Unhandled failure indexing batch, batch dropped");
            }
        }
    }

    fn admission_refused(&self, event_type: EventType, error: &QueueError) {
        warn!(event_type = %event_type, error = %error, "Event not accepted for indexing");
    }
}
