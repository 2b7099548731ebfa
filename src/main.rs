//! Veranda main entry point
//!
//! This is the command-line interface for the veranda listing pipeline:
//! crawl, clean, train, serve, stats.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use veranda::checkpoint::CheckpointStore;
use veranda::clean::{self, CleanRecord};
use veranda::config::{load_config_with_hash, Config};
use veranda::crawler::{Crawler, Fetcher};
use veranda::listing::ListingRecord;
use veranda::pricing::PriceModel;
use veranda::{dataset, pricing, serve};

/// Veranda: a patient property-listing pipeline
///
/// Veranda crawls a paginated listing search into a raw dataset, cleans it
/// into model-ready rows, fits a locality-median price model, and serves
/// price predictions over HTTP.
#[derive(Parser, Debug)]
#[command(name = "veranda")]
#[command(version = "1.0.0")]
#[command(about = "Property-listing ingestion and pricing pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "CONFIG",
        default_value = "veranda.toml"
    )]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured listing search into the raw dataset
    Crawl {
        /// Write the raw dataset here instead of the configured path
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Walk API pages up to this page number
        #[arg(long, value_name = "N")]
        pages: Option<u32>,

        /// Forget previously ingested URLs before crawling
        #[arg(long)]
        fresh: bool,
    },

    /// Clean the raw dataset into model-ready rows plus a rejects file
    Clean,

    /// Fit the price model on the clean dataset
    Train,

    /// Serve price predictions over HTTP
    Serve,

    /// Show checkpoint and artifact status
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("could not load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Crawl { out, pages, fresh } => handle_crawl(&config, out, pages, fresh).await,
        Command::Clean => handle_clean(&config),
        Command::Train => handle_train(&config),
        Command::Serve => handle_serve(&config).await,
        Command::Stats => handle_stats(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("veranda=info,warn"),
            1 => EnvFilter::new("veranda=debug,info"),
            2 => EnvFilter::new("veranda=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the crawl subcommand
async fn handle_crawl(
    config: &Config,
    out: Option<PathBuf>,
    pages: Option<u32>,
    fresh: bool,
) -> anyhow::Result<()> {
    let store = CheckpointStore::open(Path::new(&config.output.checkpoint_path)).with_context(
        || format!("could not open checkpoint store at {}", config.output.checkpoint_path),
    )?;
    if fresh {
        tracing::info!("Starting fresh: forgetting previously ingested URLs");
        store.clear()?;
    }

    let archive_dir = PathBuf::from(&config.output.html_archive_dir);
    let fetcher = Fetcher::from_config(&config.crawler, Some(archive_dir))
        .context("could not build the HTTP client")?;

    let max_pages = pages.unwrap_or(config.crawler.max_pages);
    let crawler = Crawler::new(fetcher, store, &config.site, max_pages);
    let report = crawler.crawl().await?;

    // Abort before touching the dataset: a failed first page must not
    // clobber an earlier run's output with an empty file
    if let Some(error) = report.page1_error {
        anyhow::bail!("first page fetch failed: {error}");
    }

    let out_path = out.unwrap_or_else(|| PathBuf::from(&config.output.raw_path));
    dataset::write_csv(&out_path, &report.records)?;
    println!("saved {} rows -> {}", report.records.len(), out_path.display());
    Ok(())
}

/// Handles the clean subcommand
fn handle_clean(config: &Config) -> anyhow::Result<()> {
    let summary = clean::run(
        Path::new(&config.output.raw_path),
        Path::new(&config.output.clean_path),
    )
    .context("cleaning failed")?;

    println!(
        "accepted {} rows, rejected {} -> {}",
        summary.accepted, summary.rejected, config.output.clean_path
    );
    Ok(())
}

/// Handles the train subcommand
fn handle_train(config: &Config) -> anyhow::Result<()> {
    let model = pricing::run(
        Path::new(&config.output.clean_path),
        Path::new(&config.output.model_path),
    )
    .context("training failed")?;

    println!(
        "fitted {} localities -> {}",
        model.locality_median_ppsf.len(),
        config.output.model_path
    );
    Ok(())
}

/// Handles the serve subcommand
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let model = PriceModel::load(Path::new(&config.output.model_path)).with_context(|| {
        format!(
            "could not load model artifact from {} (run `veranda train` first)",
            config.output.model_path
        )
    })?;

    serve::run(&config.serve.bind_addr, model)
        .await
        .context("prediction endpoint failed")?;
    Ok(())
}

/// Handles the stats subcommand: shows pipeline state from disk
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let checkpoint_path = Path::new(&config.output.checkpoint_path);
    if checkpoint_path.exists() {
        let store = CheckpointStore::open(checkpoint_path)?;
        println!("visited URLs: {}", store.len()?);
    } else {
        println!("visited URLs: 0 (no checkpoint yet)");
    }

    let raw_path = Path::new(&config.output.raw_path);
    if raw_path.exists() {
        let rows: Vec<ListingRecord> = dataset::read_csv(raw_path)?;
        println!("raw dataset: {} rows ({})", rows.len(), raw_path.display());
    } else {
        println!("raw dataset: not crawled yet");
    }

    let clean_path = Path::new(&config.output.clean_path);
    if clean_path.exists() {
        let rows: Vec<CleanRecord> = dataset::read_csv(clean_path)?;
        println!("clean dataset: {} rows ({})", rows.len(), clean_path.display());
    } else {
        println!("clean dataset: not cleaned yet");
    }

    let model_path = Path::new(&config.output.model_path);
    if model_path.exists() {
        let model = PriceModel::load(model_path)?;
        println!(
            "model: {} localities, trained {}",
            model.locality_median_ppsf.len(),
            model.trained_at.format("%Y-%m-%d %H:%M UTC")
        );
        if let (Some(mae), Some(r2)) = (model.validation_mae_lakhs, model.validation_r2) {
            println!("  validation: MAE {mae:.2} lakhs, R² {r2:.3}");
        }
    } else {
        println!("model: not trained yet");
    }

    Ok(())
}
