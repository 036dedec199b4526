use std::time::Duration;
use thiserror::Error;

use crate::stats::FetchOutcome;

/// Ways a single stats-page fetch can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid target '{0}'")]
    InvalidTarget(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("anti-bot challenge: {0}")]
    Challenge(String),

    #[error("no stats on page: {0}")]
    MissingFields(&'static str),
}

impl From<FetchError> for FetchOutcome {
    fn from(err: FetchError) -> Self {
        let reason = err.to_string();
        match err {
            FetchError::Challenge(_) => FetchOutcome::Blocked(reason),
            FetchError::MissingFields(_) => FetchOutcome::NoData(reason),
            FetchError::InvalidTarget(_)
            | FetchError::Request(_)
            | FetchError::Timeout(_)
            | FetchError::Status(_) => FetchOutcome::TransportError(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_maps_to_outcome_variant() {
        assert!(matches!(
            FetchOutcome::from(FetchError::Challenge("cloudflare".into())),
            FetchOutcome::Blocked(_)
        ));
        assert!(matches!(
            FetchOutcome::from(FetchError::MissingFields("rating and wins")),
            FetchOutcome::NoData(_)
        ));
        assert!(matches!(
            FetchOutcome::from(FetchError::Timeout(Duration::from_secs(30))),
            FetchOutcome::TransportError(_)
        ));
        assert!(matches!(
            FetchOutcome::from(FetchError::Status(reqwest::StatusCode::BAD_GATEWAY)),
            FetchOutcome::TransportError(_)
        ));
    }

    #[test]
    fn test_reason_keeps_error_message() {
        let outcome = FetchOutcome::from(FetchError::Timeout(Duration::from_secs(5)));
        assert_eq!(outcome, FetchOutcome::TransportError("timed out after 5s".into()));
    }
}
