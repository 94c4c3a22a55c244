use super::assembler::Batch;
use crate::config::types::RetryConfig;
use crate::index::SearchIndex;
use crate::observe::{PipelineMetrics, PipelineObserver};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a commit attempt ended. Every outcome other than `Success` means the
/// batch was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Success { documents: usize, elapsed: Duration },
    /// The index accepted the call but reported a non-zero status
    IndexRejected { status: i64, documents: usize },
    /// The index could not be reached or failed at the service level
    TransportFailure { cause: String, documents: usize },
    UnexpectedFailure { cause: String, documents: usize },
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitOutcome::Success { .. })
    }

    pub fn documents(&self) -> usize {
        match self {
            CommitOutcome::Success { documents, .. }
            | CommitOutcome::IndexRejected { documents, .. }
            | CommitOutcome::TransportFailure { documents, .. }
            | CommitOutcome::UnexpectedFailure { documents, .. } => *documents,
        }
    }
}

/// Sends batches to the index and absorbs every failure.
///
/// `commit` never returns an error and never panics, whatever the index does.
pub struct BatchCommitter {
    index: Arc<dyn SearchIndex>,
    commit_within: Duration,
    retry: RetryConfig,
    observer: Arc<dyn PipelineObserver>,
    metrics: Arc<PipelineMetrics>,
    cancel: CancellationToken,
}

impl BatchCommitter {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        commit_within: Duration,
        retry: RetryConfig,
        observer: Arc<dyn PipelineObserver>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            index,
            commit_within,
            retry,
            observer,
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting between retries once `cancel` fires. An `add` call that
    /// has started still runs to completion.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Commit a batch, consuming it regardless of the outcome
    pub async fn commit(&self, batch: Batch) -> CommitOutcome {
        let started = Instant::now();
        let mut attempt = 0;
        let mut backoff = self.retry.initial_backoff;

        let outcome = loop {
            let outcome = self.attempt(&batch, started).await;
            let cause = match &outcome {
                CommitOutcome::TransportFailure { cause, .. }
                    if attempt < self.retry.max_retries && !self.cancel.is_cancelled() =>
                {
                    cause.clone()
                }
                _ => break outcome,
            };

            attempt += 1;
            self.observer.commit_retrying(attempt, backoff, &cause);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break outcome,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = std::cmp::min(backoff * 2, self.retry.max_backoff);
        };

        self.metrics.record_commit(&outcome);
        self.observer.commit_finished(&outcome);
        outcome
    }

    async fn attempt(&self, batch: &Batch, started: Instant) -> CommitOutcome {
        let documents = batch.len();
        let call = AssertUnwindSafe(self.index.add(batch.documents(), self.commit_within));

        match call.catch_unwind().await {
            Ok(Ok(response)) if response.is_ok() => CommitOutcome::Success {
                documents,
                elapsed: started.elapsed(),
            },
            Ok(Ok(response)) => CommitOutcome::IndexRejected {
                status: response.status,
                documents,
            },
            Ok(Err(e)) if e.is_transport() => CommitOutcome::TransportFailure {
                cause: e.to_string(),
                documents,
            },
            Ok(Err(e)) => CommitOutcome::UnexpectedFailure {
                cause: e.to_string(),
                documents,
            },
            Err(panic) => CommitOutcome::UnexpectedFailure {
                cause: format!("index client panicked: {}", panic_message(panic.as_ref())),
                documents,
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::{InjectedFailure, MemoryIndex};
    use crate::observe::TracingObserver;

    fn batch(size: usize) -> Batch {
        let documents = (0..size)
            .map(|i| Document::new().with("id", format!("doc-{}", i)))
            .collect();
        Batch::new(documents).unwrap()
    }

    fn committer(index: &MemoryIndex, retry: RetryConfig) -> (BatchCommitter, Arc<PipelineMetrics>) {
        let metrics = Arc::new(PipelineMetrics::new());
        let committer = BatchCommitter::new(
            Arc::new(index.clone()),
            Duration::from_secs(60),
            retry,
            Arc::new(TracingObserver),
            metrics.clone(),
        );
        (committer, metrics)
    }

    #[tokio::test]
    async fn test_success_passes_commit_within() {
        let index = MemoryIndex::new();
        let (committer, metrics) = committer(&index, RetryConfig::default());

        let outcome = committer.commit(batch(3)).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.documents(), 3);
        assert_eq!(index.commits()[0].commit_within, Duration::from_secs(60));
        assert_eq!(metrics.snapshot().documents_committed, 3);
    }

    #[tokio::test]
    async fn test_outcomes_are_classified() {
        let index = MemoryIndex::new();
        index.fail_next(InjectedFailure::Reject(400));
        index.fail_next(InjectedFailure::Transport("connection reset".to_string()));
        index.fail_next(InjectedFailure::Unexpected("bad json".to_string()));
        let (committer, metrics) = committer(&index, RetryConfig::default());

        assert_eq!(
            committer.commit(batch(1)).await,
            CommitOutcome::IndexRejected { status: 400, documents: 1 }
        );
        assert!(matches!(
            committer.commit(batch(2)).await,
            CommitOutcome::TransportFailure { documents: 2, .. }
        ));
        assert!(matches!(
            committer.commit(batch(1)).await,
            CommitOutcome::UnexpectedFailure { documents: 1, .. }
        ));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commit_failures(), 3);
        assert_eq!(snapshot.documents_dropped, 4);
        assert_eq!(index.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_index_is_contained() {
        let index = MemoryIndex::new();
        index.fail_next(InjectedFailure::Panic("index client bug".to_string()));
        let (committer, _metrics) = committer(&index, RetryConfig::default());

        match committer.commit(batch(1)).await {
            CommitOutcome::UnexpectedFailure { cause, .. } => {
                assert!(cause.contains("index client bug"), "{}", cause);
            }
            other => panic!("expected unexpected failure, got {:?}", other),
        }

        // The committer stays usable
        assert!(committer.commit(batch(1)).await.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_transport_failure() {
        let index = MemoryIndex::new();
        index.fail_next(InjectedFailure::Transport("timeout".to_string()));
        index.fail_next(InjectedFailure::Transport("timeout".to_string()));
        let retry = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        let (committer, metrics) = committer(&index, retry);

        let started = Instant::now();
        let outcome = committer.commit(batch(2)).await;

        assert!(outcome.is_success());
        assert_eq!(index.attempts(), 3);
        // 100ms + 200ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(metrics.snapshot().transport_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ends_retry_backoff() {
        let index = MemoryIndex::new();
        for _ in 0..4 {
            index.fail_next(InjectedFailure::Transport("connection refused".to_string()));
        }
        let retry = RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(30),
        };
        let cancel = CancellationToken::new();
        let (committer, metrics) = committer(&index, retry);
        let committer = committer.with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let outcome = committer.commit(batch(2)).await;

        assert!(matches!(
            outcome,
            CommitOutcome::TransportFailure { documents: 2, .. }
        ));
        assert_eq!(index.attempts(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(metrics.snapshot().transport_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_never_repeats_rejections() {
        let index = MemoryIndex::new();
        index.fail_next(InjectedFailure::Reject(400));
        let retry = RetryConfig {
            max_retries: 3,
            ..RetryConfig::default()
        };
        let (committer, _metrics) = committer(&index, retry);

        assert!(!committer.commit(batch(1)).await.is_success());
        assert_eq!(index.attempts(), 1);
    }
}
