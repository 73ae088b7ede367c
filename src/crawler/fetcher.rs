//! HTTP fetcher implementation
//!
//! This module retrieves documents for the coordinator, including:
//! - Building the HTTP client with the configured user agent string
//! - Static GET requests with bounded redirects
//! - Dynamic rendering through a `Renderer`
//! - Retry with exponential backoff for transient network errors
//! - The per-host politeness delay

use crate::config::FetchSettings;
use crate::crawler::render::{ChromeRenderer, Renderer};
use crate::crawler::throttle::HostThrottle;
use crate::FetchError;
use reqwest::{redirect::Policy, Client, Proxy};
use scraper::Html;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A retrieved and parsed document
#[derive(Debug)]
pub struct FetchedDocument {
    /// Final URL after redirects; relative links resolve against it
    pub source_url: Url,
    pub html: Html,
    pub was_dynamically_rendered: bool,
}

impl FetchedDocument {
    /// Parses markup retrieved from `source_url`
    pub fn parse(source_url: Url, body: &str, was_dynamically_rendered: bool) -> Self {
        Self {
            source_url,
            html: Html::parse_document(body),
            was_dynamically_rendered,
        }
    }
}

/// Counters for the fetches a `Fetcher` has performed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub static_fetches: u32,
    pub dynamic_fetches: u32,
    pub retries: u32,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `settings` - Fetch settings carrying the user agent, timeout, redirect limit and proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client, or the proxy URL is invalid
///
/// # Example
///
/// ```no_run
/// use field_harvest::config::FetchSettings;
/// use field_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetchSettings::default()).unwrap();
/// ```
pub fn build_http_client(settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.static_timeout)
        .connect_timeout(settings.static_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(settings.max_redirects))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = &settings.proxy {
        tracing::debug!("Using proxy: {}", proxy_url);
        builder = builder.proxy(Proxy::all(proxy_url.as_str())?);
    }

    builder.build()
}

/// Delay before retry number `attempt + 1`: `base * 2^attempt`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Retrieves documents, statically or through a browser
pub struct Fetcher {
    client: Client,
    renderer: Arc<dyn Renderer>,
    throttle: HostThrottle,
    settings: FetchSettings,
    static_fetches: AtomicU32,
    dynamic_fetches: AtomicU32,
    retries: AtomicU32,
}

impl Fetcher {
    /// Creates a fetcher that renders with a headless Chromium
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let renderer = ChromeRenderer::new(
            settings.browser_binary.clone(),
            settings.render_wait,
            settings.render_timeout,
        )
        .with_user_agent(settings.user_agent.clone());
        Self::with_renderer(settings, Arc::new(renderer))
    }

    /// Creates a fetcher with a custom renderer
    pub fn with_renderer(
        settings: FetchSettings,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(&settings)?,
            renderer,
            throttle: HostThrottle::new(settings.min_host_delay),
            settings,
            static_fetches: AtomicU32::new(0),
            dynamic_fetches: AtomicU32::new(0),
            retries: AtomicU32::new(0),
        })
    }

    /// Fetches a document
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Connect error / timeout | Retry with backoff |
    /// | HTTP 5xx, 408, 429 | Retry with backoff |
    /// | Other HTTP 4xx | Fail immediately |
    /// | Non-HTML content | Fail immediately (`ParseFailure`) |
    /// | Render timeout / failure | Fail immediately |
    ///
    /// Retries stop after `max_retries` additional attempts; the delay
    /// before retry `n` is `backoff_base * 2^(n-1)`.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `force_dynamic` - Skip the static request and render in the browser
    pub async fn fetch(&self, url: &Url, force_dynamic: bool) -> Result<FetchedDocument, FetchError> {
        let mut attempt = 0;
        loop {
            self.throttle.wait(url).await;

            let result = if force_dynamic {
                self.fetch_dynamic(url).await
            } else {
                self.fetch_static(url).await
            };

            match result {
                Ok((source_url, body)) => {
                    return Ok(FetchedDocument::parse(source_url, &body, force_dynamic));
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = backoff_delay(self.settings.backoff_base, attempt);
                    attempt += 1;
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "{} (retry {}/{} in {:?})",
                        e,
                        attempt,
                        self.settings.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_static(&self, url: &Url) -> Result<(Url, String), FetchError> {
        self.static_fetches.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !is_html_content_type(&content_type) {
            return Err(FetchError::ParseFailure {
                url: url.to_string(),
                message: format!("expected HTML, got Content-Type '{}'", content_type),
            });
        }

        let body = response.text().await.map_err(|e| network_error(url, e))?;

        if !body.contains('<') {
            return Err(FetchError::ParseFailure {
                url: url.to_string(),
                message: "body contains no markup".to_string(),
            });
        }

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
        }

        Ok((final_url, body))
    }

    async fn fetch_dynamic(&self, url: &Url) -> Result<(Url, String), FetchError> {
        self.dynamic_fetches.fetch_add(1, Ordering::Relaxed);
        let dom = self.renderer.render(url).await?;
        Ok((url.clone(), dom))
    }

    /// Snapshot of the fetch counters
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            static_fetches: self.static_fetches.load(Ordering::Relaxed),
            dynamic_fetches: self.dynamic_fetches.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// An empty Content-Type is accepted; servers that omit it usually send HTML
fn is_html_content_type(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn network_error(url: &Url, e: reqwest::Error) -> FetchError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else if e.is_redirect() {
        format!("redirect error: {}", e)
    } else {
        e.to_string()
    };

    FetchError::Network {
        url: url.to_string(),
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}
