//! CMC Supply
//!
//! Daily snapshots of the CoinMarketCap historical listings, normalized into
//! fixed-shape rows and exported as CSV, TSV, JSON, YAML, HTML, LaTeX or
//! Markdown tables.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod scraper;
pub mod types;

#[cfg(feature = "table")]
pub mod table;

#[cfg(not(feature = "table"))]
pub mod table {
    /// Uninhabited: this build has no table support
    #[derive(Debug)]
    pub enum Table {}
}

pub use client::{ClientConfig, CmcClient, ListingsQuery, ListingsSource};
pub use config::Config;
pub use error::{SupplyError, SupplyResult};
pub use export::{Dataset, Format};
pub use scraper::{table_supported, RowsOutput, SupplyScraper};
pub use table::Table;
pub use types::*;
