//! Upstream fetching with spoofed headers and retry/backoff.
//!
//! Target sites gate their manifests behind referrer checks and sometimes
//! present TLS certificates issued for unrelated CDN domains, so the client
//! here sends a fixed browser-like header set and skips certificate
//! verification. That relaxation is deliberate: the fetched bytes are
//! treated as opaque media data, never executed or trusted.

use crate::error::{RelayError, Result};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Status codes that trigger a retry with backoff.
const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Retry behavior for [`Fetcher::fetch`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (default 3).
    pub max_retries: u32,
    /// Backoff doubles from this base between attempts.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (0-based).
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// Pooled HTTP client configured for hotlink-protected media hosts.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: Client,
    probe_client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Build a fetcher with the given per-attempt timeouts and retry policy.
    ///
    /// # Errors
    /// Returns the underlying builder error if the TLS backend cannot be
    /// initialized.
    pub fn new(
        fetch_timeout: Duration,
        probe_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .danger_accept_invalid_certs(true)
            .timeout(fetch_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(RelayError::UpstreamFetch)?;

        let probe_client = Client::builder()
            .default_headers(browser_headers())
            .danger_accept_invalid_certs(true)
            .timeout(probe_timeout)
            .build()
            .map_err(RelayError::UpstreamFetch)?;

        Ok(Self {
            client,
            probe_client,
            retry,
        })
    }

    /// Fetch `target_url` with the spoofed header set and optional referer.
    ///
    /// Retries on network errors and on `{429, 500, 502, 503, 504}` with
    /// exponential backoff; any other status is returned as-is without
    /// retry. Redirects are followed; the final response is handed back
    /// unmodified so the caller can sniff manifest vs. binary content.
    ///
    /// # Errors
    /// [`RelayError::UpstreamFetch`] for a network error on the last
    /// attempt, [`RelayError::UpstreamStatus`] when retries are exhausted
    /// on a retryable status.
    pub async fn fetch(&self, target_url: &str, referer: Option<&str>) -> Result<Response> {
        let attempts = self.retry.max_retries + 1;
        let mut last_status = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.backoff_for(attempt - 1);
                warn!("Retrying fetch of {} in {:?}", target_url, delay);
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.get(target_url);
            if let Some(referer) = referer {
                request = request.header(REFERER, referer);
            }

            match request.send().await {
                Ok(response) if RETRYABLE_STATUSES.contains(&response.status()) => {
                    warn!(
                        "Upstream returned {} for {} (attempt {}/{})",
                        response.status(),
                        target_url,
                        attempt + 1,
                        attempts
                    );
                    last_status = Some(response.status());
                }
                // Success and terminal statuses alike go straight back
                Ok(response) => return Ok(response),
                Err(e) if attempt + 1 == attempts => {
                    warn!(
                        "Fetch failed for {} (attempt {}/{}): {}",
                        target_url,
                        attempt + 1,
                        attempts,
                        e
                    );
                    return Err(RelayError::UpstreamFetch(e));
                }
                Err(e) => {
                    warn!(
                        "Fetch failed for {} (attempt {}/{}): {}",
                        target_url,
                        attempt + 1,
                        attempts,
                        e
                    );
                }
            }
        }

        Err(RelayError::UpstreamStatus(
            last_status.unwrap_or(StatusCode::BAD_GATEWAY),
        ))
    }

    /// Lightweight existence check: a single HEAD request on the short
    /// probe timeout, no retries. Returns the response status.
    pub async fn probe(&self, target_url: &str, referer: Option<&str>) -> Result<StatusCode> {
        let mut request = self.probe_client.head(target_url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(RelayError::UpstreamFetch)?;
        Ok(response.status())
    }
}

/// The fixed browser-like header set sent with every upstream request.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));
    headers
}
