//! Configuration module for Field-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and converting them into the `CrawlConfig` a crawl runs from.
//!
//! # Example
//!
//! ```no_run
//! use field_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let crawl = config.to_crawl_config().unwrap();
//! println!("Crawling {} in {} mode", crawl.target_url, crawl.mode);
//! ```

mod crawl;
mod parser;
mod types;
mod validation;

// Re-export types
pub use crawl::{CrawlConfig, CrawlMode, FetchSettings, DEFAULT_LINK_ATTRIBUTE};
pub use types::{
    Config, CrawlSection, FetchConfig, FieldEntry, ModeConfig, OnDetailError, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
