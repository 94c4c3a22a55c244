use crate::pipeline::CommitOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing pipeline health.
///
/// Owned by one pipeline instance and shared with its worker. Operators should
/// watch admissions refused, commit failures, and queue depth (see
/// [`crate::pipeline::PipelineStats`]).
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    documents_submitted: AtomicU64,
    admissions_refused: AtomicU64,
    batches_committed: AtomicU64,
    documents_committed: AtomicU64,
    commits_rejected: AtomicU64,
    transport_failures: AtomicU64,
    unexpected_failures: AtomicU64,
    documents_dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_submitted: u64,
    pub admissions_refused: u64,
    pub batches_committed: u64,
    pub documents_committed: u64,
    pub commits_rejected: u64,
    pub transport_failures: u64,
    pub unexpected_failures: u64,
    /// Documents in failed batches plus documents left in the queue at stop
    pub documents_dropped: u64,
}

impl MetricsSnapshot {
    pub fn commit_failures(&self) -> u64 {
        self.commits_rejected + self.transport_failures + self.unexpected_failures
    }

    /// Documents accepted by the queue that have been neither committed nor dropped
    pub fn documents_in_flight(&self) -> u64 {
        self.documents_submitted
            .saturating_sub(self.documents_committed + self.documents_dropped)
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_submitted(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn admission_refused(&self) {
        self.admissions_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn documents_discarded(&self, count: usize) {
        self.documents_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_commit(&self, outcome: &CommitOutcome) {
        let documents = outcome.documents() as u64;
        match outcome {
            CommitOutcome::Success { .. } => {
                self.batches_committed.fetch_add(1, Ordering::Relaxed);
                self.documents_committed
                    .fetch_add(documents, Ordering::Relaxed);
                return;
            }
            CommitOutcome::IndexRejected { .. } => {
                self.commits_rejected.fetch_add(1, Ordering::Relaxed);
            }
            CommitOutcome::TransportFailure { .. } => {
                self.transport_failures.fetch_add(1, Ordering::Relaxed);
            }
            CommitOutcome::UnexpectedFailure { .. } => {
                self.unexpected_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.documents_dropped
            .fetch_add(documents, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            admissions_refused: self.admissions_refused.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            documents_committed: self.documents_committed.load(Ordering::Relaxed),
            commits_rejected: self.commits_rejected.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            unexpected_failures: self.unexpected_failures.load(Ordering::Relaxed),
            documents_dropped: self.documents_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_commit_outcomes_counted() {
        let metrics = PipelineMetrics::new();
        for _ in 0..5 {
            metrics.document_submitted();
        }

        metrics.record_commit(&CommitOutcome::Success {
            documents: 3,
            elapsed: Duration::from_millis(4),
        });
        metrics.record_commit(&CommitOutcome::TransportFailure {
            cause: "connection reset".to_string(),
            documents: 2,
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_committed, 1);
        assert_eq!(snapshot.documents_committed, 3);
        assert_eq!(snapshot.transport_failures, 1);
        assert_eq!(snapshot.documents_dropped, 2);
        assert_eq!(snapshot.commit_failures(), 1);
        assert_eq!(snapshot.documents_in_flight(), 0);
    }

    #[test]
    fn test_in_flight_tracks_unsettled_documents() {
        let metrics = PipelineMetrics::new();
        metrics.document_submitted();
        metrics.document_submitted();
        assert_eq!(metrics.snapshot().documents_in_flight(), 2);

        metrics.documents_discarded(1);
        assert_eq!(metrics.snapshot().documents_in_flight(), 1);
    }
}
