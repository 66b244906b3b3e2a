//! Configuration management
//!
//! Optional JSON configuration file with environment variable overrides for
//! the API endpoint and default fiat. Every field has a default, so running
//! without a file is the normal case.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::client::{ClientConfig, DEFAULT_BASE_URL, EARLIEST_LISTING_DATE, UPSTREAM_BATCH_LIMIT};
use crate::types::{DEFAULT_FIAT, DEFAULT_LIMIT};

pub const ENV_BASE_URL: &str = "CMC_API_BASE_URL";
pub const ENV_FIAT: &str = "CMC_FIAT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub scrape: ScrapeDefaults,
    pub output: OutputConfig,
    pub range: RangeConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// File config when a path is given, defaults otherwise; env applied to both
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            self.api.base_url = base_url;
        }
        if let Ok(fiat) = std::env::var(ENV_FIAT) {
            self.scrape.fiat = fiat;
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            batch_limit: self.api.batch_limit,
            earliest_date: EARLIEST_LISTING_DATE,
            user_agent: self.api.user_agent.clone(),
        }
    }
}

/// Listings API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Records requested per call; upstream caps this at 5000
    pub batch_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            batch_limit: UPSTREAM_BATCH_LIMIT,
            user_agent: None,
        }
    }
}

/// Defaults for scrape parameters not given on the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeDefaults {
    pub limit: u32,
    pub fiat: String,
}

impl Default for ScrapeDefaults {
    fn default() -> Self {
        ScrapeDefaults {
            limit: DEFAULT_LIMIT,
            fiat: DEFAULT_FIAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for exported files; current directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: None,
            format: "csv".to_string(),
        }
    }
}

/// Multi-day download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Pause between consecutive days, to stay under upstream rate limits
    pub request_delay_ms: u64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        RangeConfig {
            request_delay_ms: 500,
        }
    }
}
