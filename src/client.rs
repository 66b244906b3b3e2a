//! CoinMarketCap historical listings client
//!
//! Builds the single listings-by-date request and decodes the response
//! envelope. Blocking, one call per fetch, no retries.

use chrono::{NaiveDate, NaiveTime};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{SupplyError, SupplyResult};

// =============================================================================
// Constants
// =============================================================================

pub const DEFAULT_BASE_URL: &str = "https://web-api.coinmarketcap.com";
const LISTINGS_HISTORICAL_PATH: &str = "/v1/cryptocurrency/listings/historical";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Batch size always requested upstream, whatever the caller's limit
pub const UPSTREAM_BATCH_LIMIT: u32 = 5000;

/// Earliest date CoinMarketCap has listings for (28-04-2013)
pub const EARLIEST_LISTING_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2013, 4, 28) {
    Some(date) => date,
    None => panic!("invalid earliest listing date"),
};

// =============================================================================
// Query / Source
// =============================================================================

/// What the scraper asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingsQuery {
    /// `None` falls back to the client's earliest supported date
    pub date: Option<NaiveDate>,
    /// Carried for logging only; upstream always gets the batch limit
    pub limit: u32,
    pub fiat: String,
}

/// Anything that can answer a listings query with raw per-coin records
pub trait ListingsSource {
    fn fetch_listings(&self, query: &ListingsQuery) -> SupplyResult<Vec<Value>>;
}

impl<T: ListingsSource + ?Sized> ListingsSource for &T {
    fn fetch_listings(&self, query: &ListingsQuery) -> SupplyResult<Vec<Value>> {
        (**self).fetch_listings(query)
    }
}

// =============================================================================
// Client Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub batch_limit: u32,
    pub earliest_date: NaiveDate,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch_limit: UPSTREAM_BATCH_LIMIT,
            earliest_date: EARLIEST_LISTING_DATE,
            user_agent: None,
        }
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListingsEnvelope {
    status: Status,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Status {
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

/// Decode a response body into listing records, mapping a non-zero
/// `status.error_code` to [`SupplyError::Provider`].
pub fn decode_listings(body: &str) -> SupplyResult<Vec<Value>> {
    let envelope: ListingsEnvelope = serde_json::from_str(body)
        .map_err(|e| SupplyError::Transport(format!("malformed listings payload: {}", e)))?;

    if envelope.status.error_code != 0 {
        let message = envelope
            .status
            .error_message
            .unwrap_or_else(|| format!("error code {}", envelope.status.error_code));
        return Err(SupplyError::Provider(message));
    }

    envelope
        .data
        .ok_or_else(|| SupplyError::Transport("listings payload has no data".to_string()))
}

/// UNIX timestamp of 00:00:00 UTC on `date`
pub fn day_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// =============================================================================
// CoinMarketCap Client
// =============================================================================

pub struct CmcClient {
    client: reqwest::blocking::Client,
    config: ClientConfig,
}

impl CmcClient {
    pub fn new(config: ClientConfig) -> SupplyResult<Self> {
        let mut builder = reqwest::blocking::Client::builder().timeout(config.timeout);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| SupplyError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> SupplyResult<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Listings URL for a query: `convert`, `date` and the fixed batch `limit`
    pub fn listings_url(&self, query: &ListingsQuery) -> SupplyResult<Url> {
        let date = query.date.unwrap_or(self.config.earliest_date);
        let base = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            LISTINGS_HISTORICAL_PATH
        );

        Url::parse_with_params(
            &base,
            &[
                ("convert", query.fiat.clone()),
                ("date", day_timestamp(date).to_string()),
                ("limit", self.config.batch_limit.to_string()),
            ],
        )
        .map_err(|e| SupplyError::Transport(format!("invalid listings URL '{}': {}", base, e)))
    }
}

impl ListingsSource for CmcClient {
    fn fetch_listings(&self, query: &ListingsQuery) -> SupplyResult<Vec<Value>> {
        let url = self.listings_url(query)?;
        debug!("GET {} (caller limit {})", url, query.limit);

        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        match decode_listings(&body) {
            Err(SupplyError::Transport(_)) if !status.is_success() => Err(SupplyError::Transport(
                format!("listings endpoint returned HTTP {}", status),
            )),
            other => other,
        }
    }
}
