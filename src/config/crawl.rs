//! Runtime form of a crawl request
//!
//! `Config` mirrors the TOML file; `CrawlConfig` is what the coordinator
//! runs, with every selector literal already parsed.

use crate::config::types::{Config, FetchConfig, ModeConfig, OnDetailError, UserAgentConfig};
use crate::selector::{ClassSelector, FieldMap, SelectorError};
use crate::ConfigError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Attribute read from navigation links unless the selector names another
pub const DEFAULT_LINK_ATTRIBUTE: &str = "href";

/// How the crawl moves between pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlMode {
    /// Extract from the target page only
    SinglePage,

    /// Follow a next-page link until it disappears, cycles or the page limit is hit
    Pagination { next_button_selector: ClassSelector },

    /// Complete each list record from its linked detail page, optionally
    /// paginating the list
    ListDetail {
        detail_link_selector: ClassSelector,
        next_button_selector: Option<ClassSelector>,
    },
}

impl CrawlMode {
    /// The next-page selector, if this mode paginates
    pub fn next_button_selector(&self) -> Option<&ClassSelector> {
        match self {
            Self::SinglePage => None,
            Self::Pagination { next_button_selector } => Some(next_button_selector),
            Self::ListDetail {
                next_button_selector,
                ..
            } => next_button_selector.as_ref(),
        }
    }

    /// The detail-link selector, if this mode follows detail pages
    pub fn detail_link_selector(&self) -> Option<&ClassSelector> {
        match self {
            Self::ListDetail {
                detail_link_selector,
                ..
            } => Some(detail_link_selector),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePage => write!(f, "single-page"),
            Self::Pagination { .. } => write!(f, "pagination"),
            Self::ListDetail {
                next_button_selector: Some(_),
                ..
            } => write!(f, "list-detail+pagination"),
            Self::ListDetail { .. } => write!(f, "list-detail"),
        }
    }
}

/// Immutable description of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub target_url: Url,
    pub container_selector: ClassSelector,
    pub field_map: FieldMap,
    pub mode: CrawlMode,
    pub force_dynamic_fetch: bool,
    pub max_pages: u32,
    pub max_detail_pages: Option<u32>,
    pub detail_concurrency: usize,
    pub on_detail_error: OnDetailError,
}

impl CrawlConfig {
    /// Creates a single-page crawl with default limits
    ///
    /// # Arguments
    ///
    /// * `target_url` - Absolute http(s) URL of the first page
    /// * `container_selector` - Structural selector for one repeating item
    /// * `field_map` - Fields to extract from every container
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlConfig)` - A validated configuration
    /// * `Err(ConfigError)` - Empty or malformed target URL or container selector
    pub fn new(
        target_url: &str,
        container_selector: &str,
        field_map: FieldMap,
    ) -> Result<Self, ConfigError> {
        let target_url = parse_target_url(target_url)?;

        if container_selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "container_selector cannot be empty".to_string(),
            ));
        }
        let container_selector =
            ClassSelector::parse(container_selector).map_err(|source| {
                ConfigError::InvalidSelector {
                    field: "container-selector".to_string(),
                    source,
                }
            })?;

        Ok(Self {
            target_url,
            container_selector,
            field_map,
            mode: CrawlMode::SinglePage,
            force_dynamic_fetch: false,
            max_pages: 5,
            max_detail_pages: None,
            detail_concurrency: 4,
            on_detail_error: OnDetailError::Fail,
        })
    }

    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_force_dynamic_fetch(mut self, force: bool) -> Self {
        self.force_dynamic_fetch = force;
        self
    }

    pub fn with_max_detail_pages(mut self, max_detail_pages: Option<u32>) -> Self {
        self.max_detail_pages = max_detail_pages;
        self
    }

    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency;
        self
    }

    pub fn with_on_detail_error(mut self, policy: OnDetailError) -> Self {
        self.on_detail_error = policy;
        self
    }

    /// Checks the limits that builder methods can break
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.target_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "target_url must use http or https, got '{}'",
                self.target_url
            )));
        }

        if self.max_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max_pages must be >= 1, got {}",
                self.max_pages
            )));
        }

        if self.detail_concurrency < 1 {
            return Err(ConfigError::Validation(format!(
                "detail_concurrency must be >= 1, got {}",
                self.detail_concurrency
            )));
        }

        if self.field_map.is_empty() {
            return Err(ConfigError::Validation(
                "at least one field is required".to_string(),
            ));
        }

        Ok(())
    }
}

/// Fetch layer settings in runtime units
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub static_timeout: Duration,
    pub render_timeout: Duration,
    pub render_wait: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub min_host_delay: Duration,
    pub max_redirects: usize,
    pub browser_binary: String,
    pub proxy: Option<String>,
}

impl FetchSettings {
    pub fn from_config(fetch: &FetchConfig, user_agent: &UserAgentConfig) -> Self {
        Self {
            user_agent: user_agent.header_value(),
            static_timeout: Duration::from_secs(fetch.static_timeout_secs),
            render_timeout: Duration::from_secs(fetch.render_timeout_secs),
            render_wait: Duration::from_millis(fetch.render_wait_ms),
            max_retries: fetch.max_retries,
            backoff_base: Duration::from_millis(fetch.backoff_base_ms),
            min_host_delay: Duration::from_millis(fetch.min_host_delay_ms),
            max_redirects: fetch.max_redirects,
            browser_binary: fetch.browser_binary.clone(),
            proxy: fetch.proxy.clone(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            user_agent: format!("field-harvest/{}", env!("CARGO_PKG_VERSION")),
            ..Self::from_config(
                &fetch,
                &UserAgentConfig {
                    crawler_name: String::new(),
                    crawler_version: String::new(),
                    contact_url: String::new(),
                    contact_email: String::new(),
                },
            )
        }
    }
}

impl Config {
    /// Builds the runtime crawl configuration, parsing every selector
    ///
    /// Any selector syntax error is reported here, before a single fetch.
    pub fn to_crawl_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut field_map = FieldMap::new();
        for entry in &self.fields {
            let spec = crate::selector::SelectorSpec::parse(&entry.selector).map_err(|source| {
                ConfigError::InvalidSelector {
                    field: entry.name.clone(),
                    source,
                }
            })?;
            field_map
                .insert(entry.name.clone(), spec)
                .map_err(|source| ConfigError::InvalidSelector {
                    field: entry.name.clone(),
                    source,
                })?;
        }

        let mode = match &self.mode {
            ModeConfig::SinglePage => CrawlMode::SinglePage,
            ModeConfig::Pagination {
                next_button_selector,
            } => CrawlMode::Pagination {
                next_button_selector: parse_link("next-button-selector", next_button_selector)?,
            },
            ModeConfig::ListDetail {
                detail_link_selector,
                next_button_selector,
            } => CrawlMode::ListDetail {
                detail_link_selector: parse_link("detail-link-selector", detail_link_selector)?,
                next_button_selector: next_button_selector
                    .as_deref()
                    .map(|literal| parse_link("next-button-selector", literal))
                    .transpose()?,
            },
        };

        let config = CrawlConfig::new(
            &self.crawl.target_url,
            &self.crawl.container_selector,
            field_map,
        )?
        .with_mode(mode)
        .with_force_dynamic_fetch(self.crawl.force_dynamic_fetch)
        .with_max_pages(self.crawl.max_pages)
        .with_max_detail_pages(self.crawl.max_detail_pages)
        .with_detail_concurrency(self.fetch.detail_concurrency)
        .with_on_detail_error(self.fetch.on_detail_error);

        config.validate()?;
        Ok(config)
    }

    /// Fetch layer settings derived from `[fetch]` and `[user-agent]`
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings::from_config(&self.fetch, &self.user_agent)
    }
}

fn parse_target_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::Validation(
            "target_url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target_url '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "target_url must use http or https, got '{}'",
            raw
        )));
    }

    Ok(url)
}

fn parse_link(key: &str, literal: &str) -> Result<ClassSelector, ConfigError> {
    ClassSelector::parse_link(literal, DEFAULT_LINK_ATTRIBUTE).map_err(|source: SelectorError| {
        ConfigError::InvalidSelector {
            field: key.to_string(),
            source,
        }
    })
}
