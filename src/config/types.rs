use serde::Deserialize;

/// Main configuration structure for Field-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlSection,
    #[serde(default)]
    pub mode: ModeConfig,
    /// Field selectors, in output column order
    #[serde(rename = "field", default)]
    pub fields: Vec<FieldEntry>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// What to crawl and where records live on the page
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSection {
    /// First page of the crawl
    #[serde(rename = "target-url")]
    pub target_url: String,

    /// Structural selector for one repeating item
    #[serde(rename = "container-selector")]
    pub container_selector: String,

    /// Skip the static fetch and render every page in the browser
    #[serde(rename = "force-dynamic-fetch", default)]
    pub force_dynamic_fetch: bool,

    /// Maximum number of list pages to fetch
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum number of detail pages to fetch over the whole crawl
    #[serde(rename = "max-detail-pages", default)]
    pub max_detail_pages: Option<u32>,
}

/// Navigation mode, tagged by `type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ModeConfig {
    #[default]
    #[serde(rename = "single-page")]
    SinglePage,

    #[serde(rename = "pagination")]
    Pagination {
        #[serde(rename = "next-button-selector")]
        next_button_selector: String,
    },

    #[serde(rename = "list-detail")]
    ListDetail {
        #[serde(rename = "detail-link-selector")]
        detail_link_selector: String,

        /// Optional list-level pagination after each detail queue drains
        #[serde(rename = "next-button-selector", default)]
        next_button_selector: Option<String>,
    },
}

/// One `[[field]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    pub name: String,

    /// Structural selector, `selector@attr`, or `TEXT_MATCH:Label|tag`
    pub selector: String,
}

/// What to do when a detail page cannot be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OnDetailError {
    /// Terminate the crawl as Failed
    #[default]
    #[serde(rename = "fail")]
    Fail,

    /// Keep the record with its list-page fields and continue
    #[serde(rename = "skip-and-log")]
    SkipAndLog,
}

/// Fetch layer tuning
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Timeout for one static HTTP request (seconds)
    #[serde(rename = "static-timeout-secs", default = "default_static_timeout")]
    pub static_timeout_secs: u64,

    /// Timeout for one browser render (seconds)
    #[serde(rename = "render-timeout-secs", default = "default_render_timeout")]
    pub render_timeout_secs: u64,

    /// Time the browser lets scripts run before the DOM is captured (milliseconds)
    #[serde(rename = "render-wait-ms", default = "default_render_wait")]
    pub render_wait_ms: u64,

    /// Retries after the first attempt, for network errors only
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubled on every further retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "min-host-delay-ms", default = "default_min_host_delay")]
    pub min_host_delay_ms: u64,

    /// Maximum number of detail pages fetched at once
    #[serde(rename = "detail-concurrency", default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Chromium-family browser used for dynamic rendering
    #[serde(rename = "browser-binary", default = "default_browser_binary")]
    pub browser_binary: String,

    /// Proxy for static requests (`http://` or `https://`)
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(rename = "on-detail-error", default)]
    pub on_detail_error: OnDetailError,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            static_timeout_secs: default_static_timeout(),
            render_timeout_secs: default_render_timeout(),
            render_wait_ms: default_render_wait(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
            min_host_delay_ms: default_min_host_delay(),
            detail_concurrency: default_detail_concurrency(),
            max_redirects: default_max_redirects(),
            browser_binary: default_browser_binary(),
            proxy: None,
            on_detail_error: OnDetailError::default(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

fn default_max_pages() -> u32 {
    5
}

fn default_static_timeout() -> u64 {
    15
}

fn default_render_timeout() -> u64 {
    60
}

fn default_render_wait() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1_000
}

fn default_min_host_delay() -> u64 {
    500
}

fn default_detail_concurrency() -> usize {
    4
}

fn default_max_redirects() -> usize {
    10
}

fn default_browser_binary() -> String {
    "chromium".to_string()
}
