//! Range command: one scraper and one exported file per day

use anyhow::{Context, Result};
use chrono::Duration;
use cmc_supply::{format_date, parse_date, Config, Format, ScrapeRequest, SupplyScraper};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration as StdDuration;
use tracing::{error, info};

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: &Config,
    start: String,
    days: u32,
    limit: Option<u32>,
    fiat: Option<String>,
    format: Option<String>,
    output: Option<String>,
    prefix: String,
) -> Result<()> {
    let start = parse_date(&start)?;
    let limit = limit.unwrap_or(config.scrape.limit);
    let fiat = fiat.unwrap_or_else(|| config.scrape.fiat.clone());
    let format: Format = format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()?;

    let dir = output
        .or_else(|| config.output.dir.clone())
        .map(PathBuf::from)
        .map_or_else(std::env::current_dir, Ok)
        .context("Failed to resolve output directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let delay = StdDuration::from_millis(config.range.request_delay_ms);
    let client_config = config.client_config();

    info!(
        "Downloading {} days from {} into {}",
        days,
        format_date(start),
        dir.display()
    );

    let pb = ProgressBar::new(days as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("█░ "),
    );

    let mut saved = 0usize;
    let mut failed = Vec::new();

    for i in 0..days {
        let date = start + Duration::days(i as i64);
        let label = format_date(date);
        pb.set_message(label.clone());

        let request = ScrapeRequest::builder()
            .target_day(date)
            .limit(limit)
            .fiat(fiat.clone())
            .build()?;
        let name = format!("{}_{}", prefix, label);

        let result = SupplyScraper::with_client_config(request, client_config.clone())
            .and_then(|mut scraper| {
                scraper.write_file(format, Some(name.as_str()), Some(dir.as_path()))
            });

        match result {
            Ok(path) => {
                info!("{}: saved {}", label, path.display());
                saved += 1;
            }
            Err(e) => {
                error!("{}: {}", label, e);
                failed.push(label);
            }
        }

        pb.inc(1);
        if i + 1 < days {
            sleep(delay);
        }
    }

    pb.finish_with_message(format!("{} saved", saved));

    println!("\n{}", "=".repeat(60));
    println!("RANGE SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Days requested:     {}", days);
    println!("Files saved:        {}", saved);
    println!("Days failed:        {}", failed.len());
    if !failed.is_empty() {
        println!("Failed dates:       {}", failed.join(", "));
    }
    println!("{}", "=".repeat(60));

    if saved == 0 && days > 0 {
        anyhow::bail!("No day could be downloaded");
    }

    Ok(())
}
