//! Crawler module for fetching pages and extracting records
//!
//! This module contains the core crawling logic, including:
//! - Static HTTP fetching and dynamic rendering, with retry logic
//! - Per-host politeness delays
//! - Record extraction from fetched documents
//! - Result aggregation
//! - Overall crawl coordination

mod aggregator;
mod coordinator;
mod extractor;
mod fetcher;
mod record;
mod render;
mod throttle;

pub use aggregator::ResultAggregator;
pub use coordinator::{CancelHandle, Coordinator, CrawlOutcome, CrawlStats, DoneReason, Termination};
pub use extractor::{extract, extract_detail, extract_items, find_link, ExtractedItem};
pub use fetcher::{backoff_delay, build_http_client, FetchStats, FetchedDocument, Fetcher};
pub use record::Record;
pub use render::{ChromeRenderer, Renderer};
pub use throttle::HostThrottle;

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Convert the file configuration into a `CrawlConfig`
/// 2. Build the HTTP client and browser renderer
/// 3. Fetch pages and extract records according to the crawl mode
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `cancel` - Handle that stops the crawl between fetches
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The crawl ran; it may still have ended as failed
/// * `Err(HarvestError)` - The crawl could not be started
pub async fn run_crawl(config: &Config, cancel: CancelHandle) -> Result<CrawlOutcome, HarvestError> {
    let crawl_config = config.to_crawl_config()?;
    let fetcher = Fetcher::new(config.fetch_settings())?;
    let coordinator = Coordinator::new(crawl_config, fetcher)?.with_cancel_handle(cancel);
    Ok(coordinator.run().await)
}
