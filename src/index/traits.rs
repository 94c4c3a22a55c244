use crate::document::Document;
use async_trait::async_trait;
use std::time::Duration;

/// Result of a reachability probe
#[derive(Debug, Clone, PartialEq)]
pub struct PingResponse {
    /// Server-side processing time reported by the index, in milliseconds
    pub qtime: u64,
    /// Round trip measured by the client
    pub latency: Duration,
}

/// Result of an add call that reached the index
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    /// Status reported by the index, 0 means every document was accepted
    pub status: i64,
    pub qtime: u64,
}

impl UpdateResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }
}

/// External search index the pipeline commits batches to.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Lightweight health check, used once before the pipeline starts consuming.
    async fn ping(&self) -> Result<PingResponse, IndexError>;

    /// Send documents to the index.
    ///
    /// `commit_within` is the maximum delay before the index should make the
    /// documents visible to readers. It is a hint to the index, not a client
    /// timeout.
    async fn add(
        &self,
        documents: &[Document],
        commit_within: Duration,
    ) -> Result<UpdateResponse, IndexError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index could not be reached or the request did not complete
    #[error("transport error: {0}")]
    Transport(String),

    /// The index answered with a failing HTTP status and no usable body
    #[error("index returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected index response: {0}")]
    Unexpected(String),
}

impl IndexError {
    /// Network or service level failure, as opposed to a malformed exchange
    pub fn is_transport(&self) -> bool {
        matches!(self, IndexError::Transport(_) | IndexError::Http { .. })
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_builder() {
            IndexError::Unexpected(e.to_string())
        } else {
            IndexError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Unexpected(e.to_string())
    }
}
