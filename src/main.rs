//! Field-Harvest main entry point
//!
//! This is the command-line interface for the Field-Harvest record extractor.

use anyhow::Context;
use clap::Parser;
use field_harvest::config::{load_config_with_hash, Config, ModeConfig};
use field_harvest::crawler::{run_crawl, CancelHandle, CrawlOutcome};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Field-Harvest: selector-driven record extraction
///
/// Field-Harvest reads a container selector and a set of field selectors
/// from a TOML file, crawls the target page (following pagination and
/// detail links when configured) and prints the extracted records as a
/// JSON array on stdout.
#[derive(Parser, Debug)]
#[command(name = "field-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Selector-driven record extraction", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Render every page in the headless browser
    #[arg(long)]
    force_dynamic: bool,

    /// Override the maximum number of list pages
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.force_dynamic {
        config.crawl.force_dynamic_fetch = true;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that stdout carries only the records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("field_harvest=info,warn"),
            1 => EnvFilter::new("field_harvest=debug,info"),
            2 => EnvFilter::new("field_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let crawl = config.to_crawl_config()?;

    println!("=== Field-Harvest Dry Run ===\n");

    println!("Crawl:");
    println!("  Target: {}", crawl.target_url);
    println!("  Container: {}", crawl.container_selector);
    println!("  Mode: {}", crawl.mode);
    match &config.mode {
        ModeConfig::SinglePage => {}
        ModeConfig::Pagination {
            next_button_selector,
        } => println!("  Next button: {}", next_button_selector),
        ModeConfig::ListDetail {
            detail_link_selector,
            next_button_selector,
        } => {
            println!("  Detail link: {}", detail_link_selector);
            if let Some(next) = next_button_selector {
                println!("  Next button: {}", next);
            }
        }
    }
    println!("  Max pages: {}", crawl.max_pages);
    if let Some(max) = crawl.max_detail_pages {
        println!("  Max detail pages: {}", max);
    }
    println!("  Force dynamic fetch: {}", crawl.force_dynamic_fetch);

    println!("\nFields ({}):", crawl.field_map.len());
    for (name, spec) in crawl.field_map.iter() {
        println!("  - {}: {}", name, spec);
    }

    let settings = config.fetch_settings();
    println!("\nFetch:");
    println!("  User agent: {}", settings.user_agent);
    println!("  Static timeout: {:?}", settings.static_timeout);
    println!("  Render timeout: {:?}", settings.render_timeout);
    println!("  Retries: {} (backoff base {:?})", settings.max_retries, settings.backoff_base);
    println!("  Minimum host delay: {:?}", settings.min_host_delay);
    println!("  Detail concurrency: {}", crawl.detail_concurrency);
    println!("  Browser: {}", settings.browser_binary);
    if let Some(proxy) = &settings.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let cancel = CancelHandle::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current fetch");
            on_interrupt.cancel();
        }
    });

    let outcome = run_crawl(config, cancel).await?;
    write_records(&outcome)?;

    match outcome.error() {
        None => Ok(()),
        Some(e) => Err(anyhow::anyhow!(
            "crawl failed after {} records: {}",
            outcome.records.len(),
            e
        )),
    }
}

/// Prints the records as a JSON array on stdout
fn write_records(outcome: &CrawlOutcome) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &outcome.records)?;
    writeln!(out)?;
    out.flush()?;

    tracing::info!(
        "Wrote {} records ({} list pages, {} detail pages, {} escalations, {} retries) in {}s",
        outcome.records.len(),
        outcome.stats.list_pages,
        outcome.stats.detail_pages,
        outcome.stats.escalations,
        outcome.stats.retries,
        (outcome.stats.finished_at - outcome.stats.started_at).num_seconds()
    );

    Ok(())
}
