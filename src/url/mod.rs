//! URL handling module for Field-Harvest
//!
//! This module provides URL normalization (the identity used by the visited
//! set), host extraction for politeness delays, and resolution of links
//! found on a page.

mod domain;
mod normalize;

pub use domain::extract_domain;
pub use normalize::normalize_url;

use url::Url;

/// Resolves a link href to an absolute, followable URL
///
/// Returns None if the link should not be followed:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use field_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/list?page=1").unwrap();
/// let next = resolve_link("?page=2", &base).unwrap();
/// assert_eq!(next.as_str(), "https://example.com/list?page=2");
/// assert!(resolve_link("javascript:void(0)", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if is_http(&absolute_url) => Some(absolute_url),
        _ => None,
    }
}

/// Makes an attribute value absolute without filtering it
///
/// Used for `href`/`src` field values, which are data rather than navigation.
pub fn absolutize(value: &str, base_url: &Url) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }

    base_url
        .join(value)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}
