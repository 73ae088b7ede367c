//! Dynamic rendering through a headless browser
//!
//! The fetcher only sees the `Renderer` trait. `ChromeRenderer` is the
//! production implementation; tests substitute a scripted one.

use crate::FetchError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

/// Loads a URL with scripts enabled and returns the serialized DOM
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<String, FetchError>;
}

/// Renders pages with a Chromium-family browser in headless mode
///
/// The browser is started once per page with `--dump-dom`, lets scripts run
/// for the virtual time budget, then prints the DOM on stdout. The whole
/// process is bounded by `timeout` and killed if it overruns.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: String,
    wait: Duration,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ChromeRenderer {
    /// # Arguments
    ///
    /// * `binary` - Browser executable, looked up on `PATH` if not absolute
    /// * `wait` - Script execution budget before the DOM is captured
    /// * `timeout` - Hard limit for the whole render
    pub fn new(binary: impl Into<String>, wait: Duration, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            wait,
            timeout,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn command(&self, url: &Url) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--dump-dom")
            .arg(format!("--virtual-time-budget={}", self.wait.as_millis()));
        if let Some(ua) = &self.user_agent {
            cmd.arg(format!("--user-agent={}", ua));
        }
        cmd.arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!("Rendering {} with {}", url, self.binary);

        let mut cmd = self.command(url);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(FetchError::RenderFailure {
                    url: url.to_string(),
                    message: format!("failed to start {}: {}", self.binary, e),
                })
            }
            Err(_) => {
                return Err(FetchError::RenderTimeout {
                    url: url.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::RenderFailure {
                url: url.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.binary,
                    output.status,
                    stderr.lines().last().unwrap_or("").trim()
                ),
            });
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        if dom.trim().is_empty() {
            return Err(FetchError::ParseFailure {
                url: url.to_string(),
                message: "browser returned an empty document".to_string(),
            });
        }

        Ok(dom)
    }
}
