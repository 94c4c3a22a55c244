use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate a config from a YAML string
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml)?;

    let config: Config = serde_yaml::from_str(&yaml)?;
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with the actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export SOLR_PASSWORD=...)\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_index(&config.index, &mut errors);
    validate_pipeline(&config.pipeline, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_index(index: &IndexConfig, errors: &mut Vec<String>) {
    let url = index.url.trim();
    if url.is_empty() {
        errors.push("index.url cannot be empty".to_string());
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!(
            "index.url '{}' must start with http:// or https://",
            url
        ));
    }

    if index.collection.trim_matches('/').trim().is_empty() {
        errors.push("index.collection cannot be empty".to_string());
    }

    match (&index.username, &index.password) {
        (Some(_), None) => errors.push("index.password is required when index.username is set".to_string()),
        (None, Some(_)) => errors.push("index.username is required when index.password is set".to_string()),
        _ => {}
    }

    if index.request_timeout.is_zero() {
        errors.push("index.request_timeout must be greater than zero".to_string());
    }
}

pub(crate) fn validate_pipeline(pipeline: &PipelineConfig, errors: &mut Vec<String>) {
    if pipeline.queue_capacity == 0 {
        errors.push("pipeline.queue_capacity must be greater than zero".to_string());
    }

    if pipeline.max_batch_size == 0 {
        errors.push("pipeline.max_batch_size must be greater than zero".to_string());
    }

    if pipeline.batch_window.is_zero() {
        errors.push("pipeline.batch_window must be greater than zero".to_string());
    }

    if pipeline.probe_timeout.is_zero() {
        errors.push("pipeline.probe_timeout must be greater than zero".to_string());
    }

    if pipeline.retry.max_retries > 0 && pipeline.retry.initial_backoff > pipeline.retry.max_backoff {
        errors.push(format!(
            "pipeline.retry.initial_backoff ({:?}) cannot exceed pipeline.retry.max_backoff ({:?})",
            pipeline.retry.initial_backoff, pipeline.retry.max_backoff
        ));
    }
}
