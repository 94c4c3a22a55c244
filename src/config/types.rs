use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Connection to the external search index (Solr)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the Solr server, e.g. http://localhost:8983/solr
    pub url: String,
    /// Collection (or core) receiving the documents
    pub collection: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Longest time a batch may accumulate before it is committed
    #[serde(default = "default_batch_window", with = "humantime_serde")]
    pub batch_window: Duration,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Visibility hint passed to the index with every commit
    #[serde(default = "default_commit_within", with = "humantime_serde")]
    pub commit_within: Duration,

    /// Bound on the reachability probe performed at start
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_batch_window() -> Duration {
    Duration::from_millis(2000)
}

fn default_max_batch_size() -> usize {
    200
}

fn default_commit_within() -> Duration {
    Duration::from_millis(60_000)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_window: default_batch_window(),
            max_batch_size: default_max_batch_size(),
            commit_within: default_commit_within(),
            probe_timeout: default_probe_timeout(),
            admission: AdmissionConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// What a producer experiences when the hand-off queue is full
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub strategy: AdmissionStrategy,
    /// Only used by `bounded_wait`; zero fails immediately
    #[serde(default = "default_max_wait", with = "humantime_serde")]
    pub max_wait: Duration,
}

fn default_max_wait() -> Duration {
    Duration::from_secs(1)
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            strategy: AdmissionStrategy::default(),
            max_wait: default_max_wait(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionStrategy {
    /// Wait for a free slot indefinitely
    #[default]
    Block,
    /// Wait at most `max_wait`, then refuse the document
    #[serde(rename = "bounded_wait")]
    BoundedWait,
}

/// Retry of batches that failed to reach the index. Off by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff", with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", with = "humantime_serde")]
    pub max_backoff: Duration,
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}
