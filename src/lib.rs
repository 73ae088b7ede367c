//! Field-Harvest: selector-driven record extraction
//!
//! This crate turns a container selector plus a map of field selectors into
//! structured records, following pagination and list-to-detail links and
//! falling back to a headless browser when a page is rendered by script.

pub mod config;
pub mod crawler;
pub mod selector;
pub mod state;
pub mod url;

use thiserror::Error;

pub use selector::SelectorError;

/// Main error type for Field-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Field '{field}': {source}")]
    InvalidSelector {
        field: String,
        source: SelectorError,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Page-scoped errors raised while retrieving a document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// DNS failure, refused connection, request timeout or non-2xx status
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Rendering timed out after {seconds}s for {url}")]
    RenderTimeout { url: String, seconds: u64 },

    #[error("Rendering failed for {url}: {message}")]
    RenderFailure { url: String, message: String },

    #[error("Unparseable document at {url}: {message}")]
    ParseFailure { url: String, message: String },

    #[error("Crawl cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true if a retry could plausibly succeed
    ///
    /// Only network errors are retried, and of those, client errors other
    /// than 408 and 429 are treated as permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network {
                status: Some(code), ..
            } => !(400..500).contains(code) || *code == 408 || *code == 429,
            Self::Network { status: None, .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for Field-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{load_config, Config, CrawlConfig, CrawlMode};
pub use crawler::{CancelHandle, Coordinator, CrawlOutcome, DoneReason, Record, Termination};
pub use selector::{FieldMap, SelectorSpec};
pub use url::normalize_url;
