//! Configuration system for arXiv Agent.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment -> overrides.
//! The user file lives in the platform config directory (`config.toml`), the
//! workspace file at `.arxiv-agent/config.toml`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// Environment variable prefix (`ARXIV_AGENT_ARXIV__BASE_URL`, `ARXIV_AGENT_SERVER__PORT`, ...).
pub const ENV_PREFIX: &str = "ARXIV_AGENT_";

/// Workspace-level config directory name.
pub const WORKSPACE_DIR: &str = ".arxiv-agent";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub arxiv: ArxivConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// Upstream API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Minimum spacing between consecutive requests; 0 disables it.
    pub min_request_interval_ms: u64,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://export.arxiv.org/api/query".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("arxiv-agent/{}", env!("CARGO_PKG_VERSION")),
            min_request_interval_ms: 3000,
        }
    }
}

/// Flat-file store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Cached daily results older than this are refetched.
    pub cache_max_age_hours: u64,
    /// Number of search history entries kept on disk.
    pub history_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_max_age_hours: 24,
            history_limit: 100,
        }
    }
}

/// HTTP service bind address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Reject settings that would make the client or store unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arxiv.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "arxiv.base_url must not be empty".into(),
            });
        }
        if !self.arxiv.base_url.starts_with("http://") && !self.arxiv.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                message: format!("arxiv.base_url is not an http(s) URL: {}", self.arxiv.base_url),
            });
        }
        if self.arxiv.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "arxiv.timeout_secs must be greater than 0".into(),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                message: "retry.backoff_multiplier must be at least 1.0".into(),
            });
        }
        if self.storage.history_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "storage.history_limit must be greater than 0".into(),
            });
        }
        Ok(())
    }

    /// Render the configuration as TOML, e.g. for `arxiv-agent config`.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}

/// Path of the user-level config file, when a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "arxiv-agent", "arxiv-agent")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_DIR).join("config.toml")
}

/// Load configuration by merging every layer, then validate it.
///
/// `config_file`, when given, must exist; the user and workspace files are optional.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&AppConfig>,
) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: AppConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    tracing::debug!(
        base_url = %config.arxiv.base_url,
        data_dir = %config.storage.data_dir.display(),
        "Configuration loaded"
    );
    Ok(config)
}
