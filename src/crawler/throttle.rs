//! Per-host politeness delay
//!
//! Each host has a "next free slot" instant. A caller reserves the slot
//! before fetching and pushes it forward by the minimum delay, so that both
//! sequential fetches and concurrent detail workers are spaced apart.

use crate::url::extract_domain;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Enforces a minimum delay between requests to the same host
#[derive(Debug)]
pub struct HostThrottle {
    min_delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next slot for `host` and returns how long to wait for it
    pub async fn reserve(&self, host: &str, now: Instant) -> Duration {
        let mut slots = self.next_slot.lock().await;
        let slot = match slots.get(host) {
            Some(&next) if next > now => next,
            _ => now,
        };
        slots.insert(host.to_string(), slot + self.min_delay);
        slot.duration_since(now)
    }

    /// Waits until a request to `url`'s host is allowed
    pub async fn wait(&self, url: &Url) {
        if self.min_delay.is_zero() {
            return;
        }

        let host = extract_domain(url).unwrap_or_default();
        let delay = self.reserve(&host, Instant::now()).await;
        if !delay.is_zero() {
            tracing::trace!("Waiting {:?} before requesting {}", delay, host);
            tokio::time::sleep(delay).await;
        }
    }
}
