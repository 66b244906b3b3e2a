//! Fetch command implementation

use anyhow::{Context, Result};
use cmc_supply::{Config, Format, ScrapeRequest, SupplyScraper};
use std::path::PathBuf;
use tracing::{debug, info};

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: &Config,
    date: String,
    limit: Option<u32>,
    fiat: Option<String>,
    format: Option<String>,
    name: Option<String>,
    output: Option<String>,
    print: bool,
) -> Result<()> {
    let request = ScrapeRequest::builder()
        .target_date(date)
        .limit(limit.unwrap_or(config.scrape.limit))
        .fiat(fiat.unwrap_or_else(|| config.scrape.fiat.clone()))
        .build()?;
    debug!("Request: {:?}", request);

    let mut scraper = SupplyScraper::with_client_config(request, config.client_config())?;
    info!("Starting {}", scraper);

    if print {
        scraper.get_rows(None, true)?;
        return Ok(());
    }

    let format: Format = format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()?;

    let dir = output.or_else(|| config.output.dir.clone()).map(PathBuf::from);
    if let Some(dir) = &dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let path = scraper
        .write_file(format, name.as_deref(), dir.as_deref())
        .context("Export failed")?;

    println!("{}", path.display());
    Ok(())
}
