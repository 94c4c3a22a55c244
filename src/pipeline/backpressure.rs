use crate::config::types::{AdmissionConfig, AdmissionStrategy};
use std::time::Duration;

/// Handler for backpressure based on configuration strategy.
///
/// The hand-off queue is bounded; this decides how long a producer may wait
/// for a free slot before its document is refused.
#[derive(Debug, Clone)]
pub struct BackpressureHandler {
    strategy: AdmissionStrategy,
    max_wait: Duration,
}

impl BackpressureHandler {
    pub fn new(strategy: AdmissionStrategy, max_wait: Duration) -> Self {
        Self { strategy, max_wait }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.strategy, config.max_wait)
    }

    /// Longest a producer may wait for space, `None` meaning indefinitely
    pub fn wait_limit(&self) -> Option<Duration> {
        match self.strategy {
            AdmissionStrategy::Block => None,
            AdmissionStrategy::BoundedWait => Some(self.max_wait),
        }
    }

    pub fn strategy(&self) -> AdmissionStrategy {
        self.strategy
    }
}
