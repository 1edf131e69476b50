use crate::core::currency::Currency;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub api_key: String,
    /// User access token; requests fall back to the API key without one.
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Keep query results on disk between runs.
    #[serde(default)]
    pub persist: bool,
}

fn default_stale_time_secs() -> u64 {
    5 * 60
}

fn default_retries() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            stale_time_secs: default_stale_time_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            persist: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub user_id: Option<String>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub query: QueryConfig,
    /// Base URL of the web dashboard, used to print links.
    pub app_url: Option<String>,
    pub data_path: Option<String>,
    /// Daily risk-free rate in percent for Sharpe and Sortino ratios.
    #[serde(default)]
    pub risk_free_rate: f64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "mydash", "mydash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "mydash", "mydash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
