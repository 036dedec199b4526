pub mod retry;

pub use retry::RetryController;

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::fetcher::StatsFetcher;
use crate::stats::{FetchOutcome, Snapshot, SnapshotStore};

/// Timing and target settings for the refresh loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Opaque player identifier handed to the fetcher
    pub target: String,
    /// Cadence while fetches succeed (and after the retry ceiling is hit)
    pub refresh_interval: Duration,
    /// Base delay between retries after a failure
    pub retry_interval: Duration,
    /// Upper bound of the random extra delay added to each short retry
    pub retry_jitter: Duration,
    /// Consecutive failures tolerated before falling back to `refresh_interval`
    pub retry_ceiling: u32,
    /// Deadline handed to the fetcher for one attempt
    pub fetch_timeout: Duration,
}

/// Drives fetch timing for a single target.
///
/// One attempt runs to completion before the next delay is chosen, so there
/// is never more than one fetch in flight. Successful results go to the
/// [`SnapshotStore`]; failures only move the [`RetryController`].
pub struct RefreshScheduler {
    fetcher: Arc<dyn StatsFetcher>,
    store: SnapshotStore,
    retry: RetryController,
    config: SchedulerConfig,
}

/// Running refresh loop, returned by [`RefreshScheduler::start`].
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn new(fetcher: Arc<dyn StatsFetcher>, store: SnapshotStore, config: SchedulerConfig) -> Self {
        let retry = RetryController::new(
            config.retry_ceiling,
            config.retry_interval,
            config.refresh_interval,
        );
        RefreshScheduler {
            fetcher,
            store,
            retry,
            config,
        }
    }

    #[cfg(test)]
    pub fn retry(&self) -> &RetryController {
        &self.retry
    }

    /// Spawn the refresh loop: fetch immediately, then keep re-arming.
    ///
    /// Consumes the scheduler, so a second start is impossible.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown, task }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Refresh scheduler started (fetcher={}, target={}, refresh={:?}, retry={:?}+{:?} jitter, ceiling={}, timeout={:?})",
            self.fetcher.name(),
            self.config.target,
            self.config.refresh_interval,
            self.config.retry_interval,
            self.config.retry_jitter,
            self.config.retry_ceiling,
            self.config.fetch_timeout,
        );

        loop {
            let delay = self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // Also fires if the handle was dropped
                _ = shutdown.changed() => break,
            }

            self.retry.resume();
        }

        info!("Refresh scheduler stopped");
    }

    /// Run one attempt, apply its outcome and return the delay until the next.
    pub async fn tick(&mut self) -> Duration {
        let outcome = self.fetch_once().await;
        self.apply(outcome)
    }

    /// Invoke the fetcher on its own task so a panic inside it surfaces as a
    /// failed attempt instead of killing the loop.
    async fn fetch_once(&self) -> FetchOutcome {
        let fetcher = Arc::clone(&self.fetcher);
        let target = self.config.target.clone();
        let timeout = self.config.fetch_timeout;

        match tokio::spawn(async move { fetcher.fetch(&target, timeout).await }).await {
            Ok(outcome) => outcome,
            Err(e) => FetchOutcome::TransportError(format!("fetch task failed: {}", e)),
        }
    }

    fn apply(&mut self, outcome: FetchOutcome) -> Duration {
        match outcome {
            FetchOutcome::Success(stats) => {
                // Wall clock may step back; keep fetched_at monotonic so the
                // store accepts the newer data.
                let now = Utc::now();
                let fetched_at = self.store.read().fetched_at.map_or(now, |prev| prev.max(now));
                let snapshot = Snapshot::from_stats(stats, fetched_at);
                info!(
                    "Stats refreshed for {}: rating={}, wins={}",
                    self.config.target,
                    display_opt(&snapshot.rating),
                    display_opt(&snapshot.wins),
                );
                if !self.store.replace(snapshot) {
                    warn!("Snapshot store rejected refreshed stats for {}", self.config.target);
                }
                self.retry.on_success();
                self.retry.next_delay(false, false)
            }
            failure => {
                let ceiling_reached = self.retry.on_failure();
                let mut delay = self.retry.next_delay(true, ceiling_reached);
                if !ceiling_reached {
                    delay = with_jitter(delay, self.config.retry_jitter);
                }

                let reason = match &failure {
                    FetchOutcome::NoData(r)
                    | FetchOutcome::Blocked(r)
                    | FetchOutcome::TransportError(r) => r.as_str(),
                    FetchOutcome::Success(_) => "",
                };
                if ceiling_reached {
                    error!(
                        "Fetch failed ({}: {}), {} consecutive failures; pausing retries for {:?}",
                        failure.kind(),
                        reason,
                        self.retry.consecutive_failures(),
                        delay
                    );
                } else {
                    warn!(
                        "Fetch failed ({}: {}), attempt {}/{}; retrying in {:?}",
                        failure.kind(),
                        reason,
                        self.retry.consecutive_failures(),
                        self.retry.ceiling(),
                        delay
                    );
                }
                delay
            }
        }
    }
}

impl SchedulerHandle {
    /// Ask the loop to exit at its next wait and wait for it. An attempt that
    /// is already running finishes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Refresh scheduler task ended abnormally: {}", e);
        }
    }
}

fn with_jitter(delay: Duration, max_jitter: Duration) -> Duration {
    let max_ms = max_jitter.as_millis() as u64;
    if max_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

fn display_opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string())
}
