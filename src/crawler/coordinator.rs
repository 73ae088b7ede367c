//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator drives the fetch → extract → navigate cycle as an
//! explicit state machine (`CrawlState`). It owns the visited set and the
//! result aggregator; detail-page workers only return results, which are
//! merged back here.

use crate::config::{CrawlConfig, OnDetailError};
use crate::crawler::extractor::{extract_detail, extract_items, find_link, ExtractedItem};
use crate::crawler::{Fetcher, Record, ResultAggregator};
use crate::state::{CrawlState, VisitedSet};
use crate::{ConfigError, FetchError};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Requests cooperative cancellation of a running crawl
///
/// Cancellation is observed between fetches, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a crawl ended normally
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneReason {
    /// The mode does not paginate; one list page was processed
    SinglePage,
    /// The next-page selector matched no followable link
    NavigationNotFound,
    /// The next page had already been visited
    CycleDetected(Url),
    /// `max_pages` list pages were fetched
    PageLimitReached,
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePage => write!(f, "single page processed"),
            Self::NavigationNotFound => write!(f, "no next page"),
            Self::CycleDetected(url) => write!(f, "cycle detected at {}", url),
            Self::PageLimitReached => write!(f, "page limit reached"),
        }
    }
}

/// Terminal state of a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed(DoneReason),
    Failed(FetchError),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(reason) => write!(f, "completed: {}", reason),
            Self::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// Counters and timestamps for one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub list_pages: u32,
    pub detail_pages: u32,
    pub detail_failures: u32,
    pub escalations: u32,
    pub retries: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlStats {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            list_pages: 0,
            detail_pages: 0,
            detail_failures: 0,
            escalations: 0,
            retries: 0,
            started_at: now,
            finished_at: now,
        }
    }
}

/// Records produced by a crawl, and how it ended
///
/// A failed crawl still carries every record aggregated before the failure.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    pub termination: Termination,
    pub stats: CrawlStats,
}

impl CrawlOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.termination, Termination::Completed(_))
    }

    /// The terminal error, if the crawl failed
    pub fn error(&self) -> Option<&FetchError> {
        match &self.termination {
            Termination::Failed(e) => Some(e),
            Termination::Completed(_) => None,
        }
    }
}

/// Records extracted from one list page, with its outgoing navigation
struct ListPage {
    /// Final URL of the document, after redirects
    source_url: Url,
    items: Vec<ExtractedItem>,
    next_url: Option<Url>,
}

/// A fetched detail page, as returned by a worker
struct DetailPage {
    record: Record,
    escalated: bool,
}

/// Mutable state of one crawl, touched only by the control task
struct CrawlRun {
    state: CrawlState,
    visited: VisitedSet,
    aggregator: ResultAggregator,
    stats: CrawlStats,
    /// Detail fetches started so far, successful or not
    detail_scheduled: usize,
    /// Detail records by visited-set index, shared by every record linking there
    detail_cache: HashMap<usize, Record>,
}

impl CrawlRun {
    fn new() -> Self {
        Self {
            state: CrawlState::Init,
            visited: VisitedSet::new(),
            aggregator: ResultAggregator::new(),
            stats: CrawlStats::started(),
            detail_scheduled: 0,
            detail_cache: HashMap::new(),
        }
    }

    fn transition(&mut self, next: CrawlState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("{} -> {}", self.state, next);
        self.state = next;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlConfig,
    fetcher: Fetcher,
    cancel: CancelHandle,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl to run
    /// * `fetcher` - The fetch layer to retrieve pages with
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - The configuration is valid
    /// * `Err(ConfigError)` - The configuration failed validation
    pub fn new(config: CrawlConfig, fetcher: Fetcher) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            cancel: CancelHandle::new(),
        })
    }

    /// Uses an existing cancel handle instead of a fresh one
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this coordinator's crawl
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the crawl to a terminal state
    ///
    /// Never returns early with an error: failures end the crawl as
    /// `Termination::Failed` alongside the records gathered so far.
    pub async fn run(&self) -> CrawlOutcome {
        tracing::info!(
            "Starting {} crawl of {}",
            self.config.mode,
            self.config.target_url
        );

        let mut run = CrawlRun::new();
        let termination = self.drive(&mut run).await;

        let mut stats = run.stats;
        stats.retries = self.fetcher.stats().retries;
        stats.finished_at = Utc::now();
        let records = run.aggregator.finalize();

        match &termination {
            Termination::Completed(reason) => tracing::info!(
                "Crawl completed ({}): {} records from {} list pages and {} detail pages",
                reason,
                records.len(),
                stats.list_pages,
                stats.detail_pages
            ),
            Termination::Failed(e) => tracing::error!(
                "Crawl failed: {} ({} records kept)",
                e,
                records.len()
            ),
        }

        CrawlOutcome {
            records,
            termination,
            stats,
        }
    }

    async fn drive(&self, run: &mut CrawlRun) -> Termination {
        let mut url = self.config.target_url.clone();
        run.visited.visit(&url);
        run.transition(CrawlState::Fetching);

        loop {
            let page = match self.load_list_page(run, &url).await {
                Ok(page) => page,
                Err(e) => return fail(run, e),
            };
            run.stats.list_pages += 1;
            if run.visited.visit(&page.source_url).is_new() {
                tracing::debug!("{} was served from {}", url, page.source_url);
            }
            tracing::info!(
                "Page {} ({}): {} records",
                run.stats.list_pages,
                url,
                page.items.len()
            );

            if self.config.mode.detail_link_selector().is_some() {
                run.transition(CrawlState::FollowingDetail);
                let (records, failure) = self.follow_details(run, page.items).await;
                run.aggregator.append(records);
                if let Some(e) = failure {
                    return fail(run, e);
                }
            } else {
                run.aggregator.append(page.items.into_iter().map(|item| item.record));
            }

            if self.config.mode.next_button_selector().is_none() {
                return done(run, DoneReason::SinglePage);
            }

            run.transition(CrawlState::FollowingNext);

            let Some(next) = page.next_url else {
                return done(run, DoneReason::NavigationNotFound);
            };

            if run.visited.lookup(&next).is_some() {
                tracing::info!("Next page {} was already visited, stopping", next);
                return done(run, DoneReason::CycleDetected(next));
            }

            if run.stats.list_pages >= self.config.max_pages {
                tracing::info!("Reached max_pages ({})", self.config.max_pages);
                return done(run, DoneReason::PageLimitReached);
            }

            run.visited.visit(&next);
            url = next;
            run.transition(CrawlState::Fetching);
        }
    }

    /// Fetches and extracts a list page, escalating to a dynamic fetch once
    /// if the static document has no containers
    async fn load_list_page(&self, run: &mut CrawlRun, url: &Url) -> Result<ListPage, FetchError> {
        let mut force_dynamic = self.config.force_dynamic_fetch;
        let mut escalated = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let (page, was_dynamic) = {
                let document = self
                    .fetcher
                    .fetch(url, force_dynamic)
                    .await
                    .map_err(|e| escalation_failed(url, escalated, e))?;
                let page = ListPage {
                    source_url: document.source_url.clone(),
                    items: extract_items(
                        &document,
                        &self.config.container_selector,
                        &self.config.field_map,
                        self.config.mode.detail_link_selector(),
                    ),
                    next_url: self
                        .config
                        .mode
                        .next_button_selector()
                        .and_then(|selector| find_link(&document, selector)),
                };
                (page, document.was_dynamically_rendered)
            };
            run.transition(CrawlState::Extracting);

            if page.items.is_empty() && !was_dynamic && !escalated {
                tracing::info!(
                    "No containers in static document for {}, retrying with dynamic rendering",
                    url
                );
                escalated = true;
                force_dynamic = true;
                run.stats.escalations += 1;
                run.transition(CrawlState::Fetching);
                continue;
            }

            if page.items.is_empty() {
                tracing::warn!("No containers matched '{}' on {}", self.config.container_selector, url);
            }

            return Ok(page);
        }
    }

    /// Fetches the detail pages linked from one list page and merges them
    /// into the list records
    ///
    /// Returns the records in list order, plus the error that should end the
    /// crawl, if any. Records are returned even on failure so that partial
    /// progress is kept.
    async fn follow_details(
        &self,
        run: &mut CrawlRun,
        items: Vec<ExtractedItem>,
    ) -> (Vec<Record>, Option<FetchError>) {
        let mut records = Vec::with_capacity(items.len());
        let mut links: Vec<(usize, usize)> = Vec::new();
        let mut jobs: Vec<(usize, Url)> = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            records.push(item.record);

            let Some(detail_url) = item.detail_url else {
                tracing::debug!("Record {} has no detail link", index);
                continue;
            };

            let id = match run.visited.lookup(&detail_url) {
                Some(id) => id,
                None => {
                    if self.detail_limit_reached(run.detail_scheduled + jobs.len()) {
                        tracing::debug!("Detail page limit reached, skipping {}", detail_url);
                        continue;
                    }
                    let id = run.visited.visit(&detail_url).id();
                    jobs.push((id, detail_url));
                    id
                }
            };
            links.push((index, id));
        }

        run.detail_scheduled += jobs.len();
        tracing::debug!(
            "Fetching {} detail pages ({} at a time)",
            jobs.len(),
            self.config.detail_concurrency
        );

        let mut results: Vec<(usize, Url, Result<DetailPage, FetchError>)> = stream::iter(jobs)
            .map(|(id, url)| async move {
                let result = self.load_detail_page(&url).await;
                (id, url, result)
            })
            .buffer_unordered(self.config.detail_concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(id, _, _)| *id);

        let mut failure = None;
        for (id, url, result) in results {
            match result {
                Ok(page) => {
                    run.stats.detail_pages += 1;
                    if page.escalated {
                        run.stats.escalations += 1;
                    }
                    run.detail_cache.insert(id, page.record);
                }
                Err(FetchError::Cancelled) => {
                    failure.get_or_insert(FetchError::Cancelled);
                }
                Err(e) => match self.config.on_detail_error {
                    OnDetailError::Fail => {
                        failure.get_or_insert(e);
                    }
                    OnDetailError::SkipAndLog => {
                        run.stats.detail_failures += 1;
                        tracing::warn!("Skipping detail page {}: {}", url, e);
                    }
                },
            }
        }

        for (index, id) in links {
            if let (Some(record), Some(detail)) = (records.get_mut(index), run.detail_cache.get(&id)) {
                record.merge_missing(detail);
            }
        }

        (records, failure)
    }

    /// Fetches one detail page, escalating once if no field resolves
    async fn load_detail_page(&self, url: &Url) -> Result<DetailPage, FetchError> {
        let mut force_dynamic = self.config.force_dynamic_fetch;
        let mut escalated = false;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let (record, was_dynamic) = {
                let document = self
                    .fetcher
                    .fetch(url, force_dynamic)
                    .await
                    .map_err(|e| escalation_failed(url, escalated, e))?;
                let record = extract_detail(
                    &document,
                    &self.config.container_selector,
                    &self.config.field_map,
                );
                (record, document.was_dynamically_rendered)
            };

            if record.resolved_count() == 0 && !was_dynamic && !escalated {
                tracing::info!(
                    "No fields resolved on detail page {}, retrying with dynamic rendering",
                    url
                );
                escalated = true;
                force_dynamic = true;
                continue;
            }

            return Ok(DetailPage { record, escalated });
        }
    }

    fn detail_limit_reached(&self, scheduled: usize) -> bool {
        self.config
            .max_detail_pages
            .map_or(false, |max| scheduled >= max as usize)
    }
}

/// Logs a dynamic re-fetch failure as the consequence of an empty static page
fn escalation_failed(url: &Url, escalated: bool, e: FetchError) -> FetchError {
    if escalated {
        tracing::warn!(
            "Static document for {} had nothing to extract and the dynamic re-fetch failed: {}",
            url,
            e
        );
    }
    e
}

fn done(run: &mut CrawlRun, reason: DoneReason) -> Termination {
    tracing::debug!("Done: {}", reason);
    run.transition(CrawlState::Done);
    Termination::Completed(reason)
}

fn fail(run: &mut CrawlRun, error: FetchError) -> Termination {
    run.transition(CrawlState::Failed);
    Termination::Failed(error)
}
