use serde::Serialize;
use std::fmt;

/// Lifecycle state of an indexing pipeline.
///
/// `Stopped -> Verifying -> Running -> Draining -> Stopped`, with
/// `Verifying -> Stopped` when the index is unreachable at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Stopped,
    Verifying,
    Running,
    Draining,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Stopped => "stopped",
            PipelineState::Verifying => "verifying",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
