use crate::config::{load_config, ConfigError, PipelineConfig};
use crate::event::Event;
use crate::index::{IndexError, MemoryIndex, SearchIndex, SolrIndex};
use crate::pipeline::{IndexingPipeline, PipelineError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Newline-delimited JSON events; stdin when absent
    pub input: Option<PathBuf>,
    /// Index into memory instead of the configured index
    pub dry_run: bool,
}

/// Totals for one pass over the input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub lines: u64,
    pub submitted: u64,
    pub malformed: u64,
    pub refused: u64,
    /// Input ended (as opposed to being interrupted)
    pub completed: bool,
}

pub(crate) fn config_or_exit(config_path: Option<PathBuf>) -> PathBuf {
    match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/event-indexer/config.yml");
            eprintln!("  /etc/event-indexer/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'event-indexer config init' to generate one.");
            std::process::exit(1);
        }
    }
}

pub async fn run(
    config_path: Option<PathBuf>,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    // A dry run needs no index settings, so a missing config is fine
    let config_path = match config_path {
        None if options.dry_run => None,
        other => Some(config_or_exit(other)),
    };

    run_pipeline(config_path.as_deref(), options)
        .await
        .map_err(|e| e.into())
}

async fn run_pipeline(config_path: Option<&Path>, options: RunOptions) -> Result<(), RunError> {
    let config = match config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            Some(load_config(path)?)
        }
        None => None,
    };

    let pipeline_config = config
        .as_ref()
        .map(|c| c.pipeline.clone())
        .unwrap_or_default();

    let index: Arc<dyn SearchIndex> = match (&config, options.dry_run) {
        (Some(config), false) => {
            let index = SolrIndex::new(&config.index)?;
            info!(url = %index.collection_url(), "Using Solr index");
            Arc::new(index)
        }
        _ => {
            info!("Dry run, documents are kept in memory");
            Arc::new(MemoryIndex::new())
        }
    };

    let pipeline = IndexingPipeline::new(pipeline_config, index);
    pipeline.start().await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let signal_handle = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            signal_token.cancel();
        }
    });

    let result = match &options.input {
        Some(path) => {
            info!(input = %path.display(), "Reading events");
            let file = tokio::fs::File::open(path).await?;
            ingest(&pipeline, BufReader::new(file), &shutdown).await
        }
        None => {
            info!("Reading events from stdin");
            ingest(&pipeline, BufReader::new(tokio::io::stdin()), &shutdown).await
        }
    };

    if matches!(&result, Ok(summary) if summary.completed) {
        wait_for_settle(&pipeline, &shutdown).await;
    }

    info!("Stopping pipeline");
    pipeline.stop().await?;
    signal_handle.abort();

    let summary = result?;
    let metrics = pipeline.metrics();
    info!(
        lines = summary.lines,
        submitted = summary.submitted,
        malformed = summary.malformed,
        refused = summary.refused,
        committed = metrics.documents_committed,
        dropped = metrics.documents_dropped,
        "Run finished"
    );

    Ok(())
}

/// Submit every event read from `reader` until end of input or `shutdown`.
///
/// Malformed lines and events refused by a bounded-wait admission policy are
/// logged and skipped. A stopped pipeline ends the pass with an error.
pub async fn ingest<R>(
    pipeline: &IndexingPipeline,
    reader: R,
    shutdown: &CancellationToken,
) -> Result<IngestSummary, RunError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = IngestSummary::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(summary),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            summary.completed = true;
            return Ok(summary);
        };
        summary.lines += 1;

        if line.trim().is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = summary.lines, error = %e, "Skipping malformed event");
                summary.malformed += 1;
                continue;
            }
        };

        match pipeline.submit_interruptible(&event, shutdown).await {
            Ok(()) => summary.submitted += 1,
            Err(PipelineError::QueueFull) => summary.refused += 1,
            Err(PipelineError::Interrupted) => return Ok(summary),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Wait until every submitted document has been committed or dropped
pub async fn wait_for_settle(pipeline: &IndexingPipeline, shutdown: &CancellationToken) {
    loop {
        if pipeline.metrics().documents_in_flight() == 0 {
            return;
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(SETTLE_POLL_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"{"type":"measurement","id":"7a4b5c2e-1f0d-4e8a-9b3c-2d1e0f9a8b7c","site":"plant-1","assignment":"a-1","device":"d-1","event_date":"2024-03-01T12:00:00Z","name":"temperature","value":21.5}
not json at all

{"type":"location","id":"0d9c8b7a-6f5e-4d3c-8b2a-1f0e9d8c7b6a","site":"plant-1","assignment":"a-1","device":"d-1","event_date":"2024-03-01T12:00:01Z","latitude":33.75,"longitude":-84.39}
"#;

    fn pipeline(index: &MemoryIndex) -> IndexingPipeline {
        let config = PipelineConfig {
            batch_window: Duration::from_millis(20),
            ..PipelineConfig::default()
        };
        IndexingPipeline::new(config, Arc::new(index.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_skips_malformed_lines() {
        let index = MemoryIndex::new();
        let pipeline = pipeline(&index);
        pipeline.start().await.unwrap();
        let shutdown = CancellationToken::new();

        let summary = ingest(&pipeline, EVENTS.as_bytes(), &shutdown).await.unwrap();

        assert_eq!(summary.lines, 4);
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.malformed, 1);
        assert!(summary.completed);

        wait_for_settle(&pipeline, &shutdown).await;
        assert_eq!(index.documents().len(), 2);
        pipeline.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_stops_on_shutdown() {
        let index = MemoryIndex::new();
        let pipeline = pipeline(&index);
        pipeline.start().await.unwrap();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let summary = ingest(&pipeline, EVENTS.as_bytes(), &shutdown).await.unwrap();

        assert!(!summary.completed);
        assert_eq!(summary.submitted, 0);
        pipeline.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_ingest_requires_running_pipeline() {
        let index = MemoryIndex::new();
        let pipeline = pipeline(&index);
        let shutdown = CancellationToken::new();

        let err = ingest(&pipeline, EVENTS.as_bytes(), &shutdown).await.unwrap_err();
        assert!(matches!(err, RunError::Pipeline(PipelineError::NotRunning(_))));
    }
}
