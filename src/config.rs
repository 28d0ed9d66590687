//! Configuration
//!
//! Every setting is a command-line flag with an environment-variable fallback.
//! A `.env` file in the working directory is read before parsing.

use std::path::PathBuf;

use clap::Args;

use crate::decompose::{DecomposerConfig, RetryPolicy, DEFAULT_API_URL, DEFAULT_MODEL};
use crate::store::SNAPSHOT_FILE;

/// Name of the per-user data directory under the home directory
pub const DATA_DIR_NAME: &str = ".TodoApp";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine the home directory; pass --data-dir")]
    NoHomeDir,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// API key of the chat-completion service
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Chat-completion endpoint
    #[arg(long, env = "DEEPSEEK_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Model identifier
    #[arg(long, env = "DEEPSEEK_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Directory holding the task snapshot [default: ~/.TodoApp]
    #[arg(long, env = "TODOTREE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Snapshot copied on first run [default: tasks.json next to the executable]
    #[arg(long, env = "TODOTREE_TEMPLATE", global = true)]
    pub template: Option<PathBuf>,
}

impl Config {
    /// Loads `.env` from the working directory, if there is one
    pub fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(DATA_DIR_NAME))
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    /// Bundled template snapshot, if a location can be determined
    pub fn template(&self) -> Option<PathBuf> {
        self.template.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(SNAPSHOT_FILE)))
        })
    }

    pub fn decomposer_config(&self) -> DecomposerConfig {
        DecomposerConfig {
            api_url: self.api_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            retry: RetryPolicy::default(),
        }
    }
}
