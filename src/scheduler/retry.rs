use std::time::Duration;

/// Consecutive-failure bookkeeping for the refresh loop.
///
/// While failures stay below the ceiling the loop retries on the short
/// interval; once the ceiling is hit it waits a full refresh interval, after
/// which [`resume`](RetryController::resume) clears the counter so a fresh
/// round of short retries becomes available.
#[derive(Debug, Clone)]
pub struct RetryController {
    consecutive_failures: u32,
    ceiling: u32,
    retry_interval: Duration,
    refresh_interval: Duration,
}

impl RetryController {
    pub fn new(ceiling: u32, retry_interval: Duration, refresh_interval: Duration) -> Self {
        RetryController {
            consecutive_failures: 0,
            ceiling,
            retry_interval,
            refresh_interval,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed fetch. Returns `true` when the ceiling has been reached.
    pub fn on_failure(&mut self) -> bool {
        if self.consecutive_failures < self.ceiling {
            self.consecutive_failures += 1;
        }
        self.ceiling_reached()
    }

    pub fn ceiling_reached(&self) -> bool {
        self.consecutive_failures >= self.ceiling
    }

    /// Delay before the next attempt.
    pub fn next_delay(&self, failed: bool, ceiling_reached: bool) -> Duration {
        if failed && !ceiling_reached {
            self.retry_interval
        } else {
            self.refresh_interval
        }
    }

    /// Called once the full-interval wait after hitting the ceiling has
    /// elapsed. No-op below the ceiling.
    pub fn resume(&mut self) {
        if self.ceiling_reached() {
            self.consecutive_failures = 0;
        }
    }
}
