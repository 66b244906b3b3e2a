//! Listing scraper
//!
//! Fetches one day of listings at most once per instance, normalizes every
//! entry into a [`MarketRecord`] and hands the rows out raw, encoded, as a
//! [`Table`] or written to a file.
//!
//! Rows are cached in reverse upstream order (each record is prepended as it
//! is read). For a single-date query this ordering carries no time meaning,
//! it only mirrors how the rows have always been laid out in exported files.

use chrono::NaiveDate;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::client::{ClientConfig, CmcClient, ListingsQuery, ListingsSource};
use crate::error::{SupplyError, SupplyResult};
use crate::export::{Dataset, Format};
use crate::table::Table;
use crate::types::{format_date, MarketRecord, ScrapeRequest, HEADERS};

/// Prefix of generated file names
pub const FILE_PREFIX: &str = "cmc_supply";

/// Whether [`SupplyScraper::get_table`] is available in this build
pub fn table_supported() -> bool {
    cfg!(feature = "table")
}

/// Result of [`SupplyScraper::get_rows`]
#[derive(Debug)]
pub enum RowsOutput<'a> {
    /// Rows were dumped to stdout
    Printed,
    /// Rows encoded in the requested format
    Encoded(Vec<u8>),
    Rows {
        headers: &'static [&'static str],
        rows: &'a [MarketRecord],
    },
}

pub struct SupplyScraper<S: ListingsSource = CmcClient> {
    request: ScrapeRequest,
    source: S,
    rows: Option<Vec<MarketRecord>>,
    target_date: NaiveDate,
    end_date: NaiveDate,
}

impl SupplyScraper<CmcClient> {
    /// Scraper backed by a CoinMarketCap client built from `config`
    pub fn with_client_config(request: ScrapeRequest, config: ClientConfig) -> SupplyResult<Self> {
        Ok(Self::new(request, CmcClient::new(config)?))
    }
}

impl<S: ListingsSource> SupplyScraper<S> {
    pub fn new(request: ScrapeRequest, source: S) -> Self {
        let date = request.target_date();
        SupplyScraper {
            request,
            source,
            rows: None,
            target_date: date,
            end_date: date,
        }
    }

    pub fn request(&self) -> &ScrapeRequest {
        &self.request
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Date of the last cached row once fetched, the requested date before
    pub fn target_date(&self) -> NaiveDate {
        self.target_date
    }

    /// Date of the first cached row once fetched, the requested date before
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn is_fetched(&self) -> bool {
        self.rows.is_some()
    }

    /// Cached rows, if a fetch has succeeded
    pub fn records(&self) -> Option<&[MarketRecord]> {
        self.rows.as_deref()
    }

    /// Download and normalize the listings unless already cached.
    /// A failed fetch leaves the cache untouched.
    pub fn ensure_fetched(&mut self, force: bool) -> SupplyResult<()> {
        if self.rows.is_some() && !force {
            return Ok(());
        }

        let date = self.request.target_date();
        let query = ListingsQuery {
            date: Some(date),
            limit: self.request.limit(),
            fiat: self.request.fiat().to_string(),
        };
        info!("Fetching {} listings for {}", query.fiat, format_date(date));

        let listings = self.source.fetch_listings(&query)?;
        let rows: Vec<MarketRecord> = listings
            .iter()
            .rev()
            .map(|raw| MarketRecord::from_listing(date, raw))
            .collect();

        if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
            self.end_date = first.date;
            self.target_date = last.date;
        }
        info!("Fetched {} rows for {}", rows.len(), format_date(date));

        self.rows = Some(rows);
        Ok(())
    }

    fn cached_rows(&mut self) -> SupplyResult<&[MarketRecord]> {
        self.ensure_fetched(false)?;
        Ok(self.rows.as_deref().unwrap_or_default())
    }

    /// Headers plus rows as a [`Dataset`]
    pub fn dataset(&mut self) -> SupplyResult<Dataset> {
        let rows = self.cached_rows()?;
        Ok(Dataset::new(
            HEADERS.iter().map(|h| h.to_string()).collect(),
            rows.iter().map(|r| r.cells().to_vec()).collect(),
        ))
    }

    /// `verbose` prints headers and rows; otherwise `format` selects encoded
    /// output, and with neither the raw headers and rows are returned.
    pub fn get_rows(&mut self, format: Option<Format>, verbose: bool) -> SupplyResult<RowsOutput<'_>> {
        if verbose {
            let rows = self.cached_rows()?;
            println!("{}", HEADERS.join(", "));
            for row in rows {
                let line: Vec<String> = row.cells().iter().map(|c| c.to_string()).collect();
                println!("{}", line.join(", "));
            }
            return Ok(RowsOutput::Printed);
        }

        match format {
            Some(format) => Ok(RowsOutput::Encoded(self.dataset()?.export(format)?)),
            None => Ok(RowsOutput::Rows {
                headers: &HEADERS,
                rows: self.cached_rows()?,
            }),
        }
    }

    /// Rows as a [`Table`]; `date_indexed` keys rows by date and drops the
    /// date column.
    #[cfg(feature = "table")]
    pub fn get_table(&mut self, date_indexed: bool) -> SupplyResult<Table> {
        let rows = self.cached_rows()?;
        Ok(Table::from_records(rows, date_indexed))
    }

    #[cfg(not(feature = "table"))]
    pub fn get_table(&mut self, _date_indexed: bool) -> SupplyResult<Table> {
        Err(SupplyError::UnsupportedOperation(
            "table output requires the 'table' feature".to_string(),
        ))
    }

    /// Name used when [`write_file`](Self::write_file) gets none:
    /// `cmc_supply_{fiat}_{target_date}_{end_date}`
    pub fn default_file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            FILE_PREFIX,
            self.request.fiat(),
            format_date(self.target_date),
            format_date(self.end_date)
        )
    }

    /// Encode the rows and write them to `{path}/{name}`, defaulting to the
    /// current directory and [`default_file_name`](Self::default_file_name).
    /// The format extension is appended unless `name` already ends with one
    /// of the format's extensions (`.yml` counts for YAML, `.tex` for LaTeX).
    pub fn write_file(
        &mut self,
        format: Format,
        name: Option<&str>,
        path: Option<&Path>,
    ) -> SupplyResult<PathBuf> {
        let data = self.dataset()?.export(format)?;

        let dir = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().map_err(|source| SupplyError::Export {
                path: PathBuf::from("."),
                source,
            })?,
        };

        let mut name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.default_file_name());
        if !format.has_extension(&name) {
            name.push('.');
            name.push_str(format.extension());
        }

        let file = dir.join(name);
        debug!("Writing {} bytes to {}", data.len(), file.display());
        fs::write(&file, &data).map_err(|source| SupplyError::Export {
            path: file.clone(),
            source,
        })?;

        info!(
            "Saved {} rows to {}",
            self.rows.as_ref().map_or(0, Vec::len),
            file.display()
        );
        Ok(file)
    }

    #[deprecated(note = "use `write_file(Format::Csv, ..)` instead")]
    pub fn export_csv(&mut self, name: Option<&str>, path: Option<&Path>) -> SupplyResult<PathBuf> {
        self.write_file(Format::Csv, name, path)
    }
}

impl<S: ListingsSource> fmt::Display for SupplyScraper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<SupplyScraper(target_date={}, limit={}, fiat={})>",
            format_date(self.target_date),
            self.request.limit(),
            self.request.fiat()
        )
    }
}
