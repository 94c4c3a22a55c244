use super::run::config_or_exit;
use crate::config::load_config;
use crate::index::{SearchIndex, SolrIndex};
use std::path::PathBuf;
use tracing::info;

/// Probe the configured index once and print the round trip
pub async fn ping(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_or_exit(config_path);
    let config = load_config(&config_path)?;

    let index = SolrIndex::new(&config.index)?;
    info!(url = %index.collection_url(), "Pinging index");

    let probe = tokio::time::timeout(config.pipeline.probe_timeout, index.ping())
        .await
        .map_err(|_| {
            format!(
                "no answer from {} within {:?}",
                index.collection_url(),
                config.pipeline.probe_timeout
            )
        })??;

    println!(
        "{} is reachable: latency {}ms, qtime {}ms",
        index.collection_url(),
        probe.latency.as_millis(),
        probe.qtime
    );
    Ok(())
}
