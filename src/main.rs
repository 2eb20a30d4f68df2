//! MarketLens main entry point
//!
//! This is the command-line interface for the MarketLens ingestion core.

use anyhow::Context;
use clap::{Parser, Subcommand};
use marketlens::config::{load_config_with_hash, Config};
use marketlens::extraction::RecordedOracle;
use marketlens::ingest::IngestionService;
use marketlens::storage::open_store;
use marketlens::{MarketLensError, SafetyValidator, SiteCrawler};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// MarketLens: competitive-intelligence ingestion
///
/// Validates company URLs against SSRF rules, crawls company websites to a
/// bounded depth and replaces a company's stored intelligence graph.
#[derive(Parser, Debug)]
#[command(name = "marketlens")]
#[command(version = "1.0.0")]
#[command(about = "Safe company-website crawling and intelligence ingestion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a URL against the SSRF policy and print its normalized form
    Validate {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Crawl a company website and print the result as JSON
    Scrape {
        #[arg(value_name = "URL")]
        url: String,

        /// Crawl depth (1-5); defaults to the configured depth
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Crawl a company website and replace its stored intelligence
    Ingest {
        #[arg(value_name = "URL")]
        url: String,

        /// Recorded oracle response (JSON) to extract records from
        #[arg(short, long, value_name = "FILE")]
        extraction: PathBuf,

        /// Crawl depth (1-5); defaults to the configured depth
        #[arg(short, long)]
        depth: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let outcome = match cli.command {
        Command::Validate { url } => handle_validate(&config, &url).await,
        Command::Scrape { url, depth } => handle_scrape(&config, &url, depth, &cancel).await,
        Command::Ingest {
            url,
            extraction,
            depth,
        } => handle_ingest(&config, &url, &extraction, depth, &cancel).await,
    };

    if let Err(e) = &outcome {
        if let Some(err) = e.downcast_ref::<MarketLensError>() {
            tracing::error!("{} ({:?})", err, err.failure_kind());
        }
    }

    outcome
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("marketlens=info,warn"),
            1 => EnvFilter::new("marketlens=debug,info"),
            2 => EnvFilter::new("marketlens=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Cancels `cancel` on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

/// Handles `validate`: prints the normalized URL and its resolved addresses
async fn handle_validate(config: &Config, url: &str) -> anyhow::Result<()> {
    let validator = SafetyValidator::new(&config.safety);
    let validated = validator
        .validate(url)
        .await
        .map_err(MarketLensError::from)?;

    println!("{}", validated.normalized_url());
    for address in &validated.resolved_addresses {
        println!("  {}", address);
    }

    Ok(())
}

/// Handles `scrape`: crawls and prints the site as JSON
async fn handle_scrape(
    config: &Config,
    url: &str,
    depth: Option<u32>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let crawler = SiteCrawler::from_config(config)?;
    let depth = depth.unwrap_or(config.crawler.default_depth);

    let site = crawler.crawl(url, depth, cancel).await?;

    let json = serde_json::to_string_pretty(&site).context("Failed to serialize crawl result")?;
    println!("{}", json);

    Ok(())
}

/// Handles `ingest`: crawls, replays the recorded extraction and applies
/// the replacement to the configured database
async fn handle_ingest(
    config: &Config,
    url: &str,
    extraction: &Path,
    depth: Option<u32>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let oracle = RecordedOracle::from_file(extraction).map_err(MarketLensError::from)?;

    let db_path = Path::new(&config.output.database_path);
    let store = open_store(db_path)
        .map_err(MarketLensError::from)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let service = IngestionService::new(config, Arc::new(oracle), Arc::new(Mutex::new(store)))?;
    let depth = depth.unwrap_or(config.crawler.default_depth);

    let report = service.ingest(url, depth, cancel).await?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize ingestion report")?;
    println!("{}", json);

    Ok(())
}
