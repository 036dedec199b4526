use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::FetchError;
use super::html;
use super::provider::StatsFetcher;
use crate::stats::{FetchOutcome, PlayerStats, StatValue};

/// Browser-like UA; the page serves a challenge to obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Body fragments that identify an anti-bot interstitial instead of the page.
const CHALLENGE_MARKERS: &[&str] = &[
    "just a moment...",
    "cf-challenge",
    "challenge-platform",
    "cf_chl_",
    "attention required! | cloudflare",
    "verify you are human",
];

/// Stats provider that scrapes the csstats.gg player page.
pub struct CsStatsFetcher {
    http: Client,
    /// Player pages live at `{base_url}/{target}`
    base_url: Url,
}

impl CsStatsFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid stats base URL '{}'", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Stats base URL '{}' cannot carry a path", base_url);
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CsStatsFetcher { http, base_url })
    }

    /// Player page URL; the target is percent-encoded as a single path segment.
    pub fn player_url(&self, target: &str) -> Result<Url, FetchError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(FetchError::InvalidTarget(target.to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidTarget(target.to_string()))?
            .pop_if_empty()
            .push(target);
        Ok(url)
    }

    async fn try_fetch(&self, target: &str, timeout: Duration) -> Result<PlayerStats, FetchError> {
        let url = self.player_url(target)?;
        debug!("Fetching stats page {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(e, timeout))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| request_error(e, timeout))?;

        classify_response(status, &body)
    }
}

#[async_trait]
impl StatsFetcher for CsStatsFetcher {
    fn name(&self) -> &str {
        "csstats.gg"
    }

    async fn fetch(&self, target: &str, timeout: Duration) -> FetchOutcome {
        // The per-request timeout already covers connect + body; the outer one
        // also bounds anything reqwest does outside of it (DNS, redirects).
        match tokio::time::timeout(timeout, self.try_fetch(target, timeout)).await {
            Ok(Ok(stats)) => FetchOutcome::Success(stats),
            Ok(Err(err)) => err.into(),
            Err(_) => FetchError::Timeout(timeout).into(),
        }
    }
}

fn request_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Request(err)
    }
}

/// Decide what a response means: challenge, HTTP failure, or a page to
/// extract stats from.
///
/// Regular pages can embed challenge scripts too, so on 2xx the markers only
/// count when no stats could be extracted.
pub fn classify_response(status: StatusCode, body: &str) -> Result<PlayerStats, FetchError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Challenge("rate limited (HTTP 429)".to_string()));
    }
    if status.is_success() {
        return extract_stats(body).map_err(|err| match challenge_marker(body) {
            Some(marker) => challenge(status, marker),
            None => err,
        });
    }
    if status == StatusCode::FORBIDDEN || status == StatusCode::SERVICE_UNAVAILABLE {
        if let Some(marker) = challenge_marker(body) {
            return Err(challenge(status, marker));
        }
    }
    Err(FetchError::Status(status))
}

fn challenge(status: StatusCode, marker: &str) -> FetchError {
    FetchError::Challenge(format!("HTTP {} with '{}'", status.as_u16(), marker))
}

fn challenge_marker(body: &str) -> Option<&'static str> {
    let lc = body.to_ascii_lowercase();
    CHALLENGE_MARKERS.iter().copied().find(|m| lc.contains(m))
}

/// Pull rating, wins and player name out of the page.
pub fn extract_stats(body: &str) -> Result<PlayerStats, FetchError> {
    let rating = html::text_by_class(body, None, "cs2rating")
        .or_else(|| html::text_by_class(body, None, "rank"))
        .and_then(|t| StatValue::parse(&t));

    let wins = html::text_by_class(body, None, "wins")
        .and_then(|t| {
            let t = t.trim_start_matches(|c: char| c.is_alphabetic() || c == ':' || c.is_whitespace());
            html::leading_number(t)
        })
        .or_else(|| html::text_after_label(body, "wins"))
        .and_then(|t| StatValue::parse(&t));

    if rating.is_none() && wins.is_none() {
        return Err(FetchError::MissingFields("rating and wins"));
    }

    let name = html::text_by_class(body, Some("h1"), "player-name");

    Ok(PlayerStats { name, rating, wins })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    const PLAYER_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>s1mple - CS2 Stats</title></head>
<body>
  <h1 class="player-name">s1mple</h1>
  <div class="player-ranks">
    <div class="cs2rating"><span>18,000</span></div>
  </div>
  <div class="stats-row"><span class="wins">Wins: 40</span></div>
</body></html>"#;

    const CHALLENGE_PAGE: &str = r#"<html><head><title>Just a moment...</title></head>
<body><div id="challenge-platform"></div></body></html>"#;

    #[test]
    fn test_extract_full_page() {
        let stats = extract_stats(PLAYER_PAGE).unwrap();
        assert_eq!(stats.name.as_deref(), Some("s1mple"));
        assert_eq!(stats.rating, Some(StatValue::Number(18000)));
        assert_eq!(stats.wins, Some(StatValue::Number(40)));
    }

    #[test]
    fn test_extract_rank_fallback_and_wins_label() {
        let page = r#"<div class="rank">Unranked</div><p>Wins</p><p>7</p>"#;
        let stats = extract_stats(page).unwrap();
        assert_eq!(stats.rating, Some(StatValue::Text("Unranked".into())));
        assert_eq!(stats.wins, Some(StatValue::Number(7)));
        assert_eq!(stats.name, None);
    }

    #[test]
    fn test_extract_missing_fields_is_no_data() {
        let err = extract_stats("<html><body>Player not found</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::MissingFields(_)));
    }

    #[test]
    fn test_classify_challenge_on_200() {
        let err = classify_response(StatusCode::OK, CHALLENGE_PAGE).unwrap_err();
        assert!(matches!(err, FetchError::Challenge(_)));
    }

    #[test]
    fn test_classify_page_with_embedded_challenge_script_is_success() {
        let page = PLAYER_PAGE.replace(
            "</body>",
            r#"<script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script></body>"#,
        );
        let stats = classify_response(StatusCode::OK, &page).unwrap();
        assert_eq!(stats.rating, Some(StatValue::Number(18000)));
        assert_eq!(stats.wins, Some(StatValue::Number(40)));
    }

    #[test]
    fn test_classify_empty_page_without_markers_is_no_data() {
        let err = classify_response(StatusCode::OK, "<html><body></body></html>").unwrap_err();
        assert!(matches!(err, FetchError::MissingFields(_)));
    }

    #[test]
    fn test_classify_challenge_on_403() {
        let err = classify_response(StatusCode::FORBIDDEN, CHALLENGE_PAGE).unwrap_err();
        assert!(matches!(err, FetchError::Challenge(_)));
    }

    #[test]
    fn test_classify_rate_limit_is_blocked() {
        let err = classify_response(StatusCode::TOO_MANY_REQUESTS, "").unwrap_err();
        assert!(matches!(
            FetchOutcome::from(err),
            FetchOutcome::Blocked(_)
        ));
    }

    #[test]
    fn test_classify_plain_server_error_is_transport() {
        let err = classify_response(StatusCode::BAD_GATEWAY, "bad gateway").unwrap_err();
        assert!(matches!(err, FetchError::Status(StatusCode::BAD_GATEWAY)));
    }

    #[test]
    fn test_player_url_encodes_target() {
        let fetcher = CsStatsFetcher::new("https://csstats.gg/player").unwrap();
        assert_eq!(
            fetcher.player_url("76561198034202275").unwrap().as_str(),
            "https://csstats.gg/player/76561198034202275"
        );
        assert_eq!(
            fetcher.player_url("../admin").unwrap().as_str(),
            "https://csstats.gg/player/..%2Fadmin"
        );
    }

    #[test]
    fn test_player_url_with_trailing_slash_base() {
        let fetcher = CsStatsFetcher::new("https://csstats.gg/player/").unwrap();
        assert_eq!(
            fetcher.player_url("123").unwrap().as_str(),
            "https://csstats.gg/player/123"
        );
    }

    #[test]
    fn test_empty_target_rejected() {
        let fetcher = CsStatsFetcher::new("https://csstats.gg/player").unwrap();
        assert!(matches!(
            fetcher.player_url("  "),
            Err(FetchError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_base() {
        assert!(CsStatsFetcher::new("not a url").is_err());
        assert!(CsStatsFetcher::new("mailto:someone@example.com").is_err());
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/player", addr)
    }

    #[tokio::test]
    async fn test_fetch_success_from_local_server() {
        let base = serve(Router::new().route("/player/:id", get(|| async { PLAYER_PAGE }))).await;
        let fetcher = CsStatsFetcher::new(&base).unwrap();

        let outcome = fetcher.fetch("123", Duration::from_secs(5)).await;
        match outcome {
            FetchOutcome::Success(stats) => {
                assert_eq!(stats.rating, Some(StatValue::Number(18000)));
                assert_eq!(stats.wins, Some(StatValue::Number(40)));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_challenge_from_local_server() {
        let base = serve(Router::new().route(
            "/player/:id",
            get(|| async { (AxumStatus::FORBIDDEN, CHALLENGE_PAGE) }),
        ))
        .await;
        let fetcher = CsStatsFetcher::new(&base).unwrap();

        let outcome = fetcher.fetch("123", Duration::from_secs(5)).await;
        assert!(matches!(outcome, FetchOutcome::Blocked(_)), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_fetch_times_out_as_transport_error() {
        let base = serve(Router::new().route(
            "/player/:id",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                PLAYER_PAGE
            }),
        ))
        .await;
        let fetcher = CsStatsFetcher::new(&base).unwrap();

        let started = std::time::Instant::now();
        let outcome = fetcher.fetch("123", Duration::from_millis(200)).await;
        assert!(matches!(outcome, FetchOutcome::TransportError(_)), "{:?}", outcome);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = CsStatsFetcher::new(&format!("http://{}/player", addr)).unwrap();
        let outcome = fetcher.fetch("123", Duration::from_secs(2)).await;
        assert!(matches!(outcome, FetchOutcome::TransportError(_)), "{:?}", outcome);
    }
}
