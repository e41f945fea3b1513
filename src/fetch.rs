use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::settings::Settings;

/// Loads pages either over HTTP or, for anything that is not an http(s) URL,
/// from the local filesystem (saved copies of the wiki pages).
pub struct Fetcher {
    client: reqwest::Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Fetcher {
            client,
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
        })
    }

    pub async fn load(&self, source: &str) -> Result<String> {
        if is_remote(source) {
            self.get_with_retry(source).await
        } else {
            debug!(path = source, "reading local page");
            tokio::fs::read_to_string(source)
                .await
                .with_context(|| format!("Failed to read {}", source))
        }
    }

    async fn get_with_retry(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            debug!(url, attempt, "GET");
            let failure = match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .text()
                        .await
                        .with_context(|| format!("Failed to read body of {}", url));
                }
                Ok(resp) if !is_retryable(resp.status()) => {
                    bail!("GET {} returned {}", url, resp.status());
                }
                Ok(resp) => format!("status {}", resp.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                bail!("GET {} failed after {} attempts: {}", url, attempt + 1, failure);
            }
            let backoff = self.backoff(attempt);
            warn!(
                "GET {} failed ({}), attempt {}/{}, backing off {:.1}s",
                url,
                failure,
                attempt + 1,
                self.max_retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Doubles per attempt, saturating for large retry counts.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
