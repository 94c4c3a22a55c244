pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# EVENT INDEXER CONFIGURATION
# =============================================================================
# Indexes device events (measurements, locations, alerts) into Apache Solr.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/event-indexer/config.yml
#   3. /etc/event-indexer/config.yml
#
# Any value may reference an environment variable with $env{NAME}.

# =============================================================================
# INDEX
# =============================================================================
index:
  # Base URL of the Solr server
  url: http://localhost:8983/solr
  # Collection (or core) that receives event documents
  collection: sitewhere
  # Optional basic auth; set both or neither
  # username: indexer
  # password: $env{SOLR_PASSWORD}
  # Timeout applied to every HTTP request
  request_timeout: 30s

# =============================================================================
# PIPELINE
# =============================================================================
pipeline:
  # Documents buffered between producers and the indexing worker.
  # When full, producers wait (see admission below).
  queue_capacity: 1000
  # A batch is committed at the latest this long after its cycle starts
  batch_window: 2s
  # ...or as soon as it holds this many documents
  max_batch_size: 200
  # Maximum delay before Solr makes committed documents searchable
  commit_within: 60s
  # Bound on the reachability check performed at startup
  probe_timeout: 10s

  admission:
    # 'block': producers wait for free space indefinitely
    # 'bounded_wait': producers wait at most max_wait, then the event is refused
    strategy: block
    max_wait: 1s

  retry:
    # Extra attempts for batches that failed to reach Solr (0 = drop on failure)
    max_retries: 0
    initial_backoff: 500ms
    max_backoff: 30s
"#
    .to_string()
}
