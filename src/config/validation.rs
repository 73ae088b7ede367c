use crate::config::types::{Config, CrawlSection, FetchConfig, FieldEntry, ModeConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound for concurrent detail fetches
const MAX_DETAIL_CONCURRENCY: usize = 32;

/// Validates the entire configuration
///
/// Selector literals are parsed as the last step, so a configuration that
/// passes here is guaranteed to convert into a `CrawlConfig`.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_section(&config.crawl)?;
    validate_mode(&config.mode)?;
    validate_fields(&config.fields)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    config.to_crawl_config()?;
    Ok(())
}

/// Validates the `[crawl]` section
fn validate_crawl_section(config: &CrawlSection) -> Result<(), ConfigError> {
    if config.target_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "target-url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(config.target_url.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid target-url '{}': {}", config.target_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "target-url '{}' must use http or https",
            config.target_url
        )));
    }

    if config.container_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "container-selector cannot be empty".to_string(),
        ));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates the `[mode]` section
fn validate_mode(mode: &ModeConfig) -> Result<(), ConfigError> {
    match mode {
        ModeConfig::SinglePage => {}
        ModeConfig::Pagination {
            next_button_selector,
        } => require_selector("next-button-selector", next_button_selector)?,
        ModeConfig::ListDetail {
            detail_link_selector,
            next_button_selector,
        } => {
            require_selector("detail-link-selector", detail_link_selector)?;
            if let Some(next) = next_button_selector {
                require_selector("next-button-selector", next)?;
            }
        }
    }
    Ok(())
}

fn require_selector(key: &str, literal: &str) -> Result<(), ConfigError> {
    if literal.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
    }
    Ok(())
}

/// Validates `[[field]]` entries
fn validate_fields(fields: &[FieldEntry]) -> Result<(), ConfigError> {
    if fields.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[field]] is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "field name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }

        if field.selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "field '{}' has an empty selector",
                field.name
            )));
        }
    }

    Ok(())
}

/// Validates the `[fetch]` section
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.static_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "static-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.render_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "render-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.render_wait_ms / 1000 >= config.render_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "render-wait-ms ({}ms) must be shorter than render-timeout-secs ({}s)",
            config.render_wait_ms, config.render_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.detail_concurrency < 1 || config.detail_concurrency > MAX_DETAIL_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "detail-concurrency must be between 1 and {}, got {}",
            MAX_DETAIL_CONCURRENCY, config.detail_concurrency
        )));
    }

    if config.browser_binary.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser-binary cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("proxy '{}': {}", proxy, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "proxy must use http or https, got '{}'",
                url.scheme()
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
