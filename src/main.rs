//! CMC Supply - main entry point
//!
//! This binary provides two subcommands:
//! - fetch: Download one day of listings and export it
//! - range: Download consecutive days, one file per day

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmc_supply::Config;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "cmc-supply")]
#[command(about = "Daily CoinMarketCap listing snapshots as tabular files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download listings for one date and export them
    Fetch {
        /// Target date (DD-MM-YYYY)
        #[arg(short, long)]
        date: String,

        /// Number of records wanted
        #[arg(short, long)]
        limit: Option<u32>,

        /// Fiat code used for price conversion. E.g., "USD", "EUR"
        #[arg(short, long)]
        fiat: Option<String>,

        /// Export format (csv, tsv, json, yaml, html, latex, md)
        #[arg(long)]
        format: Option<String>,

        /// Output file name (extension appended when missing)
        #[arg(short, long)]
        name: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<String>,

        /// Print rows to stdout instead of writing a file
        #[arg(long)]
        print: bool,
    },

    /// Download listings for a run of consecutive dates
    Range {
        /// First date (DD-MM-YYYY)
        #[arg(short, long)]
        start: String,

        /// Number of days to download
        #[arg(short, long, default_value = "365")]
        days: u32,

        /// Number of records wanted per day
        #[arg(short, long)]
        limit: Option<u32>,

        /// Fiat code used for price conversion
        #[arg(short, long)]
        fiat: Option<String>,

        /// Export format (csv, tsv, json, yaml, html, latex, md)
        #[arg(long)]
        format: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<String>,

        /// File name prefix; files are named {prefix}_{DD-MM-YYYY}.{ext}
        #[arg(long, default_value = "cmc_supply")]
        prefix: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep the console clean for the progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Fetch { .. } => ("fetch", false),
        Commands::Range { .. } => ("range", true), // File-only for clean progress bar
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    let config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {}", path.display());
    }

    match cli.command {
        Commands::Fetch {
            date,
            limit,
            fiat,
            format,
            name,
            output,
            print,
        } => commands::fetch::run(&config, date, limit, fiat, format, name, output, print),

        Commands::Range {
            start,
            days,
            limit,
            fiat,
            format,
            output,
            prefix,
        } => commands::range::run(&config, start, days, limit, fiat, format, output, prefix),
    }
}
