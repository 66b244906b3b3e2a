//! Core data types: scrape parameters, normalized listing rows and cells

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

use crate::error::{SupplyError, SupplyResult};

/// Day-month-year, the textual date form used on input and in exported rows
pub const DATE_FORMAT: &str = "%d-%m-%Y";

pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_FIAT: &str = "USD";

/// Number of columns in every normalized row
pub const FIELD_COUNT: usize = 17;

/// Column names, in row order
pub const HEADERS: [&str; FIELD_COUNT] = [
    "date",
    "id",
    "name",
    "symbol",
    "slug",
    "date_added",
    "tags",
    "max_supply",
    "circulating_supply",
    "total_supply",
    "infinite_supply",
    "cmc_rank",
    "self_reported_circulating_supply",
    "self_reported_market_cap",
    "tvl_ratio",
    "last_updated",
    "quote",
];

/// Parse a `DD-MM-YYYY` date (zero padding optional)
pub fn parse_date(s: &str) -> SupplyResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
        SupplyError::InvalidParameters(format!(
            "'{}' is not a valid date, expected DD-MM-YYYY ({})",
            s, e
        ))
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// =============================================================================
// Scrape Request
// =============================================================================

/// Parameters of one scrape. Only obtainable through [`ScrapeRequest::builder`],
/// which enforces that a target date is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    target_date: NaiveDate,
    limit: u32,
    fiat: String,
}

impl ScrapeRequest {
    pub fn builder() -> ScrapeRequestBuilder {
        ScrapeRequestBuilder::default()
    }

    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn fiat(&self) -> &str {
        &self.fiat
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequestBuilder {
    target_date: Option<String>,
    limit: Option<u32>,
    fiat: Option<String>,
}

impl ScrapeRequestBuilder {
    /// Target date as `DD-MM-YYYY`
    pub fn target_date(mut self, date: impl Into<String>) -> Self {
        self.target_date = Some(date.into());
        self
    }

    pub fn target_day(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(format_date(date));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fiat(mut self, fiat: impl Into<String>) -> Self {
        self.fiat = Some(fiat.into());
        self
    }

    pub fn build(self) -> SupplyResult<ScrapeRequest> {
        let raw_date = self
            .target_date
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                SupplyError::InvalidParameters(
                    "Please provide 'target_date' for which data is to be scraped.".to_string(),
                )
            })?;
        let target_date = parse_date(&raw_date)?;

        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(SupplyError::InvalidParameters(
                "'limit' must be a positive number".to_string(),
            ));
        }

        let fiat = self
            .fiat
            .unwrap_or_else(|| DEFAULT_FIAT.to_string())
            .trim()
            .to_uppercase();
        if fiat.len() != 3 || !fiat.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SupplyError::InvalidParameters(format!(
                "'{}' is not a three-letter fiat code",
                fiat
            )));
        }

        Ok(ScrapeRequest {
            target_date,
            limit,
            fiat,
        })
    }
}

// =============================================================================
// Cells
// =============================================================================

/// One field of a normalized row. `Null` is the sentinel for anything the
/// upstream record did not provide.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    /// Nested structure passed through untouched (tags, quote)
    Json(Value),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Cell::Json(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(x) => serializer.serialize_f64(*x),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
            Cell::Json(v) => v.serialize(serializer),
        }
    }
}

// =============================================================================
// Market Record
// =============================================================================

/// One coin's listing snapshot, normalized to the fixed 17-column shape.
/// `None` marks a field the upstream record omitted or sent with the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRecord {
    pub date: NaiveDate,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub slug: Option<String>,
    pub date_added: Option<String>,
    pub tags: Option<Value>,
    pub max_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub infinite_supply: Option<bool>,
    pub cmc_rank: Option<i64>,
    pub self_reported_circulating_supply: Option<f64>,
    pub self_reported_market_cap: Option<f64>,
    pub tvl_ratio: Option<f64>,
    pub last_updated: Option<String>,
    pub quote: Option<Value>,
}

impl MarketRecord {
    /// Normalize one raw listing entry. Total: any JSON value yields a record.
    pub fn from_listing(date: NaiveDate, raw: &Value) -> Self {
        let empty = Map::new();
        let obj = match raw.as_object() {
            Some(obj) => obj,
            None => {
                warn!("Listing entry is not an object, keeping date only: {}", raw);
                &empty
            }
        };

        MarketRecord {
            date,
            id: field(obj, "id"),
            name: field(obj, "name"),
            symbol: field(obj, "symbol"),
            slug: field(obj, "slug"),
            date_added: field(obj, "date_added"),
            tags: field(obj, "tags"),
            max_supply: field(obj, "max_supply"),
            circulating_supply: field(obj, "circulating_supply"),
            total_supply: field(obj, "total_supply"),
            infinite_supply: field(obj, "infinite_supply"),
            cmc_rank: field(obj, "cmc_rank"),
            self_reported_circulating_supply: field(obj, "self_reported_circulating_supply"),
            self_reported_market_cap: field(obj, "self_reported_market_cap"),
            tvl_ratio: field(obj, "tvl_ratio"),
            last_updated: field(obj, "last_updated"),
            quote: field(obj, "quote"),
        }
    }

    /// Row view in [`HEADERS`] order
    pub fn cells(&self) -> [Cell; FIELD_COUNT] {
        let text = |v: &Option<String>| v.clone().map_or(Cell::Null, Cell::Text);
        let float = |v: Option<f64>| v.map_or(Cell::Null, Cell::Float);
        let json = |v: &Option<Value>| v.clone().map_or(Cell::Null, Cell::Json);

        [
            Cell::Date(self.date),
            self.id.map_or(Cell::Null, Cell::Int),
            text(&self.name),
            text(&self.symbol),
            text(&self.slug),
            text(&self.date_added),
            json(&self.tags),
            float(self.max_supply),
            float(self.circulating_supply),
            float(self.total_supply),
            self.infinite_supply.map_or(Cell::Null, Cell::Bool),
            self.cmc_rank.map_or(Cell::Null, Cell::Int),
            float(self.self_reported_circulating_supply),
            float(self.self_reported_market_cap),
            float(self.tvl_ratio),
            text(&self.last_updated),
            json(&self.quote),
        ]
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => match <T as Deserialize>::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Field '{}' has unexpected value {} ({}), using null", key, value, e);
                None
            }
        },
    }
}
