//! HTTP fetching with retry, backoff, and politeness pauses
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with browser-like user agent strings
//! - GET requests with bounded retry and randomized exponential backoff
//! - Politeness pauses between successive page fetches
//! - Best-effort archiving of raw response bodies

use crate::config::CrawlerConfig;
use crate::crawler::FetchError;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Builds an HTTP client from the crawler configuration
///
/// # Arguments
///
/// * `config` - The crawler section of the configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited page fetcher
///
/// One `Fetcher` serves a whole crawl. Requests are issued one at a time;
/// the politeness pause between pages is the caller's to insert via
/// [`Fetcher::pause`].
pub struct Fetcher {
    client: Client,
    retry_attempts: u32,
    backoff_cap_secs: u64,
    min_pause_ms: u64,
    max_pause_ms: u64,
    archive_dir: Option<PathBuf>,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler section of the configuration
    /// * `archive_dir` - Directory for raw HTML snapshots, or `None` to
    ///   skip archiving
    pub fn from_config(
        config: &CrawlerConfig,
        archive_dir: Option<PathBuf>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            retry_attempts: config.retry_attempts,
            backoff_cap_secs: config.backoff_cap_secs,
            min_pause_ms: config.min_pause_ms,
            max_pause_ms: config.max_pause_ms,
            archive_dir,
        })
    }

    /// Fetches `url` and returns its body text.
    ///
    /// Non-2xx statuses and transport failures both count as failed
    /// attempts. Up to `retry-attempts` attempts are made; between
    /// attempts the fetcher sleeps a random interval drawn from an
    /// exponentially widening window capped at `backoff-cap-secs`.
    /// A zero cap skips the sleep entirely.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Response body of the first successful attempt
    /// * `Err(FetchError)` - The failure of the final attempt
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            debug!(url, attempt, "fetching page");
            let error = match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if attempt >= self.retry_attempts {
                warn!(url, attempt, "fetch failed, attempts exhausted: {error}");
                return Err(error);
            }

            let wait_ms = random_backoff_ms(attempt, self.backoff_cap_secs);
            warn!(url, attempt, wait_ms, "fetch failed, retrying: {error}");
            if wait_ms > 0 {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
            attempt += 1;
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    /// Sleeps a random politeness interval between page fetches.
    ///
    /// The interval is uniform over `min-pause-ms..=max-pause-ms`.
    /// A zero maximum skips the sleep, which keeps tests fast.
    pub async fn pause(&self) {
        if self.max_pause_ms == 0 {
            return;
        }
        let wait_ms = random_in_range(self.min_pause_ms, self.max_pause_ms);
        debug!(wait_ms, "politeness pause");
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    }

    /// Writes a raw response body under the archive directory.
    ///
    /// Archiving is best-effort: failures are logged and swallowed so a
    /// full disk never aborts a crawl.
    pub fn archive(&self, file_name: &str, body: &str) {
        let Some(dir) = &self.archive_dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(dir.join(file_name), body))
        {
            warn!(file_name, "could not archive raw page: {e}");
        }
    }
}

/// Backoff wait before retry `attempt` (1-based), in milliseconds.
///
/// Drawn uniformly from `0..=min(2^attempt, cap)` seconds, the widening
/// window keeping concurrent crawlers from retrying in lockstep.
fn random_backoff_ms(attempt: u32, cap_secs: u64) -> u64 {
    let window_secs = backoff_window_secs(attempt, cap_secs);
    if window_secs == 0 {
        return 0;
    }
    random_in_range(0, window_secs * 1000)
}

fn backoff_window_secs(attempt: u32, cap_secs: u64) -> u64 {
    // 2^attempt, saturating well past any realistic cap
    let exponential = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    exponential.min(cap_secs)
}

fn random_in_range(low: u64, high: u64) -> u64 {
    use rand::Rng;
    rand::rng().random_range(low..=high)
}
