use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_DIR: &str = "dados_mercado";
const DEFAULT_PROVIDER_URL: &str = "https://data.marketpulse.dev/api";
const DEFAULT_LOOKBACK_DAYS: u32 = 7;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Fatal at startup, before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("ticker list must not be empty")]
    EmptyTickers,

    #[error("lookback window must be at least 1 day")]
    InvalidLookback,
}

/// YAML-serializable configuration structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigYaml {
    pub tickers: Vec<String>,
    pub api_key: String,
    pub provider_url: Option<String>,
    pub base_dir: Option<String>,
    pub lookback_days: Option<u32>,
    pub retry_max_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
}

/// Application-wide settings: built once at process start, read-only for the
/// rest of the run.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub tickers: Arc<Vec<String>>,
    pub api_key: String,
    pub provider_url: String,
    pub base_dir: PathBuf,
    pub lookback_days: u32,
    pub retry_max_attempts: u32,
    pub retry_delay: Duration,
}

impl AppConfig {
    /// Load configuration from a YAML file (when `CONFIG_FILE` is set) or
    /// from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        let yaml_config: ConfigYaml = serde_yaml::from_str(&yaml_content)?;

        Self::build(
            yaml_config.tickers,
            yaml_config.api_key,
            yaml_config.provider_url,
            yaml_config.base_dir,
            yaml_config.lookback_days,
            yaml_config.retry_max_attempts,
            yaml_config.retry_delay_secs,
        )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let tickers: Vec<String> = env::var("TICKERS")
            .map_err(|_| ConfigError::Missing("TICKERS"))?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let api_key =
            env::var("MARKET_API_KEY").map_err(|_| ConfigError::Missing("MARKET_API_KEY"))?;

        Self::build(
            tickers,
            api_key,
            env::var("PROVIDER_URL").ok(),
            env::var("BASE_DIR").ok(),
            env::var("LOOKBACK_DAYS").ok().and_then(|s| s.parse().ok()),
            env::var("RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok()),
            env::var("RETRY_DELAY_SECS").ok().and_then(|s| s.parse().ok()),
        )
    }

    fn build(
        tickers: Vec<String>,
        api_key: String,
        provider_url: Option<String>,
        base_dir: Option<String>,
        lookback_days: Option<u32>,
        retry_max_attempts: Option<u32>,
        retry_delay_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let tickers: Vec<String> = tickers
            .into_iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if tickers.is_empty() {
            return Err(ConfigError::EmptyTickers);
        }
        if api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }

        let lookback_days = lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
        if lookback_days < 1 {
            return Err(ConfigError::InvalidLookback);
        }

        Ok(Self {
            tickers: Arc::new(tickers),
            api_key,
            provider_url: provider_url.unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            base_dir: PathBuf::from(base_dir.unwrap_or_else(|| DEFAULT_BASE_DIR.to_string())),
            lookback_days,
            retry_max_attempts: retry_max_attempts.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS),
            retry_delay: Duration::from_secs(
                retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            ),
        })
    }
}
