use async_trait::async_trait;
use std::time::Duration;

use crate::stats::FetchOutcome;

/// Trait that every stats source must implement.
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    /// Fetch the current stats for `target`.
    ///
    /// Must resolve within `timeout` (reporting `TransportError` when it
    /// doesn't) and release everything it acquired before returning.
    async fn fetch(&self, target: &str, timeout: Duration) -> FetchOutcome;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
