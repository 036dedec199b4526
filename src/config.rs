use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

/// Cached csstats.gg rating/wins feed for stream overlays
#[derive(Parser, Debug, Clone)]
#[command(name = "csstats-overlay", version, about)]
pub struct Config {
    /// Player identifier on the stats site (Steam64 ID)
    #[arg(long, env = "TARGET_ID", default_value = "76561198034202275")]
    pub target_id: String,

    /// Base URL of the player pages; the target is appended as a path segment
    #[arg(long, env = "STATS_BASE_URL", default_value = "https://csstats.gg/player")]
    pub stats_base_url: String,

    /// Listen address for the stats/overlay endpoints
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: String,

    /// Steady-state refresh interval in seconds
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "1800")]
    pub refresh_interval_secs: u64,

    /// Base delay before retrying a failed fetch, in seconds
    #[arg(long, env = "RETRY_INTERVAL_SECS", default_value = "30")]
    pub retry_interval_secs: u64,

    /// Maximum random extra delay added to each retry, in seconds
    #[arg(long, env = "RETRY_JITTER_SECS", default_value = "30")]
    pub retry_jitter_secs: u64,

    /// Consecutive failures before falling back to the refresh interval
    #[arg(long, env = "RETRY_CEILING", default_value = "3")]
    pub retry_ceiling: u32,

    /// Per-fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// How often the overlay page polls /stats, in seconds
    #[arg(long, env = "OVERLAY_POLL_SECS", default_value = "60")]
    pub overlay_poll_secs: u64,
}

/// Longest overlay poll interval accepted; the page timer takes milliseconds.
const MAX_OVERLAY_POLL_SECS: u64 = 24 * 60 * 60;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.target_id.trim().is_empty() {
            anyhow::bail!("TARGET_ID must not be empty");
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be positive");
        }
        if self.retry_interval_secs == 0 {
            anyhow::bail!("retry_interval_secs must be positive");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }
        if self.overlay_poll_secs == 0 {
            anyhow::bail!("overlay_poll_secs must be positive");
        }
        if self.overlay_poll_secs > MAX_OVERLAY_POLL_SECS {
            anyhow::bail!(
                "overlay_poll_secs must be at most {} (one day)",
                MAX_OVERLAY_POLL_SECS
            );
        }
        url::Url::parse(&self.stats_base_url)
            .map_err(|e| anyhow::anyhow!("stats_base_url is not a valid URL: {}", e))?;
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("listen_addr '{}' is invalid: {}", self.listen_addr, e))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            target: self.target_id.trim().to_string(),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            retry_interval: Duration::from_secs(self.retry_interval_secs),
            retry_jitter: Duration::from_secs(self.retry_jitter_secs),
            retry_ceiling: self.retry_ceiling,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["csstats-overlay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&["--target-id", "123"]);
        config.validate().unwrap();

        let sc = config.scheduler_config();
        assert_eq!(sc.target, "123");
        assert_eq!(sc.refresh_interval, Duration::from_secs(30 * 60));
        assert_eq!(sc.retry_interval, Duration::from_secs(30));
        assert_eq!(sc.retry_jitter, Duration::from_secs(30));
        assert_eq!(sc.retry_ceiling, 3);
        assert_eq!(sc.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.listen_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = parse(&["--target-id", "123", "--retry-interval-secs", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlay_poll_bounds() {
        let config = parse(&["--target-id", "123", "--overlay-poll-secs", "86400"]);
        config.validate().unwrap();
        let config = parse(&["--target-id", "123", "--overlay-poll-secs", "1844674407370955161"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_listen_addr_rejected() {
        let config = parse(&["--target-id", "123", "--listen-addr", "localhost"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let config = parse(&["--target-id", "123", "--stats-base-url", "csstats.gg"]);
        assert!(config.validate().is_err());
    }
}
