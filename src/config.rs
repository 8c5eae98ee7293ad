//! Ambient configuration loading: environment variables (via `dotenvy`),
//! overridable by an optional `canopy.toml`, with documented defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_concurrency() -> usize {
    25
}

fn default_quiescence_period_seconds() -> u64 {
    60
}

fn default_llm_timeout_seconds() -> u64 {
    30
}

fn default_llm_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_llm_model() -> String {
    "local-model".to_string()
}

/// Overrides read from an optional `canopy.toml` in the repository root (or
/// the current directory). Every field has a spec-documented default, so a
/// missing file is not an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_quiescence_period_seconds")]
    pub quiescence_period_seconds: u64,
    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,
    /// Extra ignored directory globs, appended to the built-in table.
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
    /// Extra ignored file globs, appended to the built-in table.
    #[serde(default)]
    pub ignore_files: Vec<String>,
    /// OpenAI-compatible chat-completions endpoint used by Tier 3.
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Never read from `canopy.toml` — only from the `LLM_API_KEY`
    /// environment variable, so a secret never ends up checked into a repo.
    #[serde(skip)]
    pub llm_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            concurrency: default_concurrency(),
            quiescence_period_seconds: default_quiescence_period_seconds(),
            llm_timeout_seconds: default_llm_timeout_seconds(),
            ignore_dirs: Vec::new(),
            ignore_files: Vec::new(),
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
        }
    }
}

/// Base directory for the temp-clone convention
/// (`<data_dir>/tmp_repos/<sanitized_name>_<timestamp>/`) and the default
/// cache directory root. Read from `APP_DATA_DIR`, falling back to the
/// platform temp directory.
pub fn app_data_dir() -> PathBuf {
    std::env::var_os("APP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Loads `.env` (if present, via `dotenvy`) and an optional `canopy.toml`
/// found under `repo_root`. Malformed TOML is a hard error; a missing file
/// silently falls back to defaults.
pub fn load(repo_root: &Path) -> anyhow::Result<AppConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(dotenvy::Error::Io(_)) => {}
        Err(e) => tracing::warn!(error = %e, "failed to parse .env, ignoring"),
    }

    let config_path = repo_root.join("canopy.toml");
    let mut config = match std::fs::read_to_string(&config_path) {
        Ok(raw) => {
            let config: AppConfig = toml::from_str(&raw)?;
            tracing::info!(path = %config_path.display(), "loaded canopy.toml");
            config
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => return Err(e.into()),
    };

    config.llm_api_key = std::env::var("LLM_API_KEY").ok();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.concurrency, 25);
        assert_eq!(config.quiescence_period_seconds, 60);
    }

    #[test]
    fn missing_canopy_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.concurrency, 25);
    }

    #[test]
    fn canopy_toml_overrides_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("canopy.toml"), "concurrency = 4\n").unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.quiescence_period_seconds, 60);
    }
}
