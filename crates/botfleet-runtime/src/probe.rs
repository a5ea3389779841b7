//! Gateway readiness probe
//!
//! A bounded liveness wait after create/start: GET the gateway until it
//! answers 200 or the ceiling passes. Timing out is not an error.

use std::time::Duration;
use tokio::time::{sleep, Instant};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    client: reqwest::Client,
    interval: Duration,
    timeout: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_TIMEOUT)
    }
}

impl ReadinessProbe {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            interval,
            timeout,
        }
    }

    /// Local gateway URL for an external port
    pub fn gateway_url(port: u32) -> String {
        format!("http://localhost:{}", port)
    }

    /// Poll `url`; `true` once it returns 200, `false` on timeout.
    pub async fn wait(&self, url: &str) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.client.get(url).send().await {
                Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                    tracing::debug!(url = %url, attempts, "Gateway ready");
                    return true;
                }
                Ok(resp) => tracing::trace!(url = %url, status = %resp.status(), "Gateway not ready"),
                Err(e) => tracing::trace!(url = %url, error = %e, "Gateway not reachable"),
            }

            if Instant::now() + self.interval > deadline {
                tracing::warn!(url = %url, attempts, "Gateway did not become ready in time");
                return false;
            }
            sleep(self.interval).await;
        }
    }
}
