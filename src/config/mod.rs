pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, parse_config, ConfigError};
pub use types::{
    AdmissionConfig, AdmissionStrategy, Config, IndexConfig, PipelineConfig, RetryConfig,
};

/// Matches $env{VAR_NAME} where VAR_NAME starts with a letter or underscore
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Replace a leading `~` with the home directory, as a shell would for a
/// `--config` argument passed in quotes.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return path.to_path_buf(),
    };

    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home,
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Per-user config file, checked before the system-wide one
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/event-indexer/config.yml"))
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/event-indexer/config.yml")
}

/// Pick the config file the indexer should load.
///
/// `--config` always wins, even if the file is missing, so the load error
/// names the path the operator typed. Otherwise the per-user file is used
/// when present, then the system-wide file. `None` means neither exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    user_config_path()
        .into_iter()
        .chain(std::iter::once(system_config_path()))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("EI_TEST_VAR", "test_value");
        let result = expand_env_vars("path/$env{EI_TEST_VAR}/file");
        assert_eq!(result, "path/test_value/file");
        std::env::remove_var("EI_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_multiple() {
        std::env::set_var("EI_VAR1", "value1");
        std::env::set_var("EI_VAR2", "value2");
        let result = expand_env_vars("$env{EI_VAR1}/middle/$env{EI_VAR2}");
        assert_eq!(result, "value1/middle/value2");
        std::env::remove_var("EI_VAR1");
        std::env::remove_var("EI_VAR2");
    }

    #[test]
    fn test_expand_env_vars_unset() {
        let result = expand_env_vars("secret: $env{EI_NONEXISTENT_VAR}");
        assert_eq!(result, "secret: $env{EI_NONEXISTENT_VAR}");
    }

    #[test]
    fn test_expand_env_vars_ignores_shell_syntax() {
        let result = expand_env_vars("${SOLR_HOST}:$SOLR_PORT");
        assert_eq!(result, "${SOLR_HOST}:$SOLR_PORT");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/indexer/config.yml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("indexer/config.yml"));
        }
    }

    #[test]
    fn test_expand_tilde_bare_and_other_user() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("~solr/config.yml")), Path::new("~solr/config.yml"));
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        let expanded = expand_tilde(Path::new("/absolute/path"));
        assert_eq!(expanded, Path::new("/absolute/path"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/tmp/indexer.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/indexer.yml")));
    }
}
