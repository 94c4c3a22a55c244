use super::traits::{IndexError, PingResponse, SearchIndex, UpdateResponse};
use crate::document::Document;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Failure to produce on an upcoming `add` call
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// Accept the call but report this non-zero status
    Reject(i64),
    Transport(String),
    Unexpected(String),
    Panic(String),
}

/// One accepted `add` call
#[derive(Debug, Clone)]
pub struct CommittedBatch {
    pub documents: Vec<Document>,
    pub commit_within: Duration,
    pub committed_at: Instant,
}

#[derive(Debug, Default)]
struct MemoryIndexState {
    reachable: bool,
    commits: Vec<CommittedBatch>,
    attempts: usize,
    failures: VecDeque<InjectedFailure>,
    add_delay: Option<Duration>,
}

/// In-process index used for dry runs and tests.
///
/// Records every successful add call and can be scripted to fail.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    state: Arc<Mutex<MemoryIndexState>>,
    committed: Arc<Notify>,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryIndexState {
                reachable: true,
                ..Default::default()
            })),
            committed: Arc::new(Notify::new()),
        }
    }

    /// An index that fails every ping until made reachable
    pub fn unreachable() -> Self {
        let index = Self::new();
        index.set_reachable(false);
        index
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryIndexState> {
        // A panic injected into `add` never happens while the lock is held
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Queue a failure for the next `add` call that has none queued before it
    pub fn fail_next(&self, failure: InjectedFailure) {
        self.lock().failures.push_back(failure);
    }

    /// Delay every `add` call, simulating a slow index
    pub fn set_add_delay(&self, delay: Option<Duration>) {
        self.lock().add_delay = delay;
    }

    pub fn commits(&self) -> Vec<CommittedBatch> {
        self.lock().commits.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.lock().commits.len()
    }

    /// Number of add calls made, including failed ones
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Every committed document, in commit order
    pub fn documents(&self) -> Vec<Document> {
        self.lock()
            .commits
            .iter()
            .flat_map(|c| c.documents.iter().cloned())
            .collect()
    }

    /// Wait until at least `count` batches have been committed
    pub async fn wait_for_commits(&self, count: usize) {
        loop {
            let notified = self.committed.notified();
            if self.commit_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn ping(&self) -> Result<PingResponse, IndexError> {
        if self.lock().reachable {
            Ok(PingResponse {
                qtime: 0,
                latency: Duration::ZERO,
            })
        } else {
            Err(IndexError::Transport("connection refused".to_string()))
        }
    }

    async fn add(
        &self,
        documents: &[Document],
        commit_within: Duration,
    ) -> Result<UpdateResponse, IndexError> {
        let (delay, failure) = {
            let mut state = self.lock();
            state.attempts += 1;
            (state.add_delay, state.failures.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match failure {
            Some(InjectedFailure::Reject(status)) => {
                return Ok(UpdateResponse { status, qtime: 0 });
            }
            Some(InjectedFailure::Transport(cause)) => return Err(IndexError::Transport(cause)),
            Some(InjectedFailure::Unexpected(cause)) => return Err(IndexError::Unexpected(cause)),
            Some(InjectedFailure::Panic(cause)) => panic!("{}", cause),
            None => {}
        }

        self.lock().commits.push(CommittedBatch {
            documents: documents.to_vec(),
            commit_within,
            committed_at: Instant::now(),
        });
        self.committed.notify_waiters();

        Ok(UpdateResponse { status: 0, qtime: 0 })
    }
}
