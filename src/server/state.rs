use crate::{
    config::Config,
    fetch::{Fetcher, RetryPolicy},
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers.
///
/// Everything here is read-only after construction; request handling keeps
/// no other shared state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared upstream fetcher (connection pooling)
    pub fetcher: Fetcher,
    /// Server start time, reported by the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration.
    pub fn new(config: Config) -> crate::error::Result<Self> {
        let fetcher = Fetcher::new(
            config.fetch_timeout,
            config.probe_timeout,
            RetryPolicy {
                max_retries: config.max_retries,
                backoff_base: config.backoff_base,
            },
        )?;

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            started_at: Instant::now(),
        })
    }
}
