//! Shared fixtures for the integration tests

use async_trait::async_trait;
use field_harvest::config::{CrawlConfig, CrawlMode, FetchSettings, DEFAULT_LINK_ATTRIBUTE};
use field_harvest::crawler::{CancelHandle, Coordinator, Fetcher, Renderer};
use field_harvest::selector::{ClassSelector, FieldMap};
use field_harvest::FetchError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetch settings with short timeouts and no politeness delay
pub fn test_settings() -> FetchSettings {
    FetchSettings {
        user_agent: "TestHarvester/1.0 (+https://example.com/bot; bot@example.com)".to_string(),
        static_timeout: Duration::from_secs(5),
        render_timeout: Duration::from_secs(5),
        render_wait: Duration::from_millis(100),
        max_retries: 2,
        backoff_base: Duration::from_millis(10),
        min_host_delay: Duration::ZERO,
        max_redirects: 5,
        browser_binary: "unused-in-tests".to_string(),
        proxy: None,
    }
}

/// An HTML response
pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

/// Mounts a page that must be requested exactly `times` times
pub async fn mount_page(server: &MockServer, route: &str, body: impl Into<String>, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

pub fn link(css: &str) -> ClassSelector {
    ClassSelector::parse_link(css, DEFAULT_LINK_ATTRIBUTE).unwrap()
}

pub fn config(target: String, container: &str, fields: &[(&str, &str)]) -> CrawlConfig {
    let field_map = FieldMap::parse(fields.iter().copied()).unwrap();
    CrawlConfig::new(&target, container, field_map).unwrap()
}

pub fn pagination(next: &str) -> CrawlMode {
    CrawlMode::Pagination {
        next_button_selector: link(next),
    }
}

pub fn list_detail(detail: &str, next: Option<&str>) -> CrawlMode {
    CrawlMode::ListDetail {
        detail_link_selector: link(detail),
        next_button_selector: next.map(link),
    }
}

/// Builds a coordinator around a scripted renderer
pub fn coordinator(config: CrawlConfig, renderer: Arc<ScriptedRenderer>) -> Coordinator {
    let fetcher = Fetcher::with_renderer(test_settings(), renderer).unwrap();
    Coordinator::new(config, fetcher).unwrap()
}

/// Renderer that serves canned DOMs by URL path and records every call
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    cancel_on: Option<(String, CancelHandle)>,
    timeouts: Vec<String>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, route: &str, dom: impl Into<String>) -> Self {
        self.pages.insert(route.to_string(), dom.into());
        self
    }

    /// Requests cancellation while rendering `route`
    pub fn cancel_on(mut self, route: &str, handle: CancelHandle) -> Self {
        self.cancel_on = Some((route.to_string(), handle));
        self
    }

    /// Fails every render of `route` with `RenderTimeout`
    pub fn timeout_on(mut self, route: &str) -> Self {
        self.timeouts.push(route.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, url: &Url) -> Result<String, FetchError> {
        let route = url.path().to_string();
        self.calls.lock().unwrap().push(route.clone());

        if let Some((cancel_route, handle)) = &self.cancel_on {
            if *cancel_route == route {
                handle.cancel();
            }
        }

        if self.timeouts.contains(&route) {
            return Err(FetchError::RenderTimeout {
                url: url.to_string(),
                seconds: 5,
            });
        }

        self.pages
            .get(&route)
            .cloned()
            .ok_or_else(|| FetchError::RenderFailure {
                url: url.to_string(),
                message: "no scripted page".to_string(),
            })
    }
}

/// Values of one field across all records
pub fn column(records: &[field_harvest::Record], name: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get(name).unwrap_or("").to_string())
        .collect()
}
