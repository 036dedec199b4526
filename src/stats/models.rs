use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// A stat as scraped from the source page: a plain number when the text is
/// one (after dropping thousands separators), otherwise the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(u64),
    Text(String),
}

impl StatValue {
    /// Parse raw field text. Returns `None` for blank input.
    ///
    /// "18,000" → `Number(18000)`, "18 000" → `Number(18000)`,
    /// "Unranked" → `Text("Unranked")`.
    pub fn parse(raw: &str) -> Option<StatValue> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let digits: String = trimmed.chars().filter(|c| !is_separator(*c)).collect();

        // "1.5" style decimals would silently become 15, so only strip
        // separators when every group after the first has exactly 3 digits.
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && groups_are_thousands(trimmed)
        {
            if let Ok(n) = digits.parse::<u64>() {
                return Some(StatValue::Number(n));
            }
        }

        Some(StatValue::Text(trimmed.to_string()))
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, ',' | '.' | '\'' | ' ' | '\u{a0}' | '\u{202f}')
}

fn groups_are_thousands(s: &str) -> bool {
    let groups: Vec<&str> = s.split(is_separator).collect();
    match groups.split_first() {
        Some((_, [])) => true,
        Some((first, rest)) => {
            (1..=3).contains(&first.len()) && rest.iter().all(|g| g.len() == 3)
        }
        None => false,
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Number(n) => write!(f, "{}", n),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

/// Fields extracted from one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStats {
    pub name: Option<String>,
    pub rating: Option<StatValue>,
    pub wins: Option<StatValue>,
}

/// The cached last-known-good result.
///
/// Replaced only as a whole. `fetched_at` is `None` until the first
/// successful fetch, which is what "loading" means to readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub name: Option<String>,
    pub rating: Option<StatValue>,
    pub wins: Option<StatValue>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn from_stats(stats: PlayerStats, fetched_at: DateTime<Utc>) -> Self {
        Snapshot {
            name: stats.name,
            rating: stats.rating,
            wins: stats.wins,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn is_present(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Result of one fetcher invocation.
///
/// The failure reasons are for logs only; scheduling decisions look at the
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(PlayerStats),
    /// Page reachable but the expected fields were missing or unparseable
    NoData(String),
    /// Anti-bot challenge served instead of the page
    Blocked(String),
    /// Network error, timeout or unexpected HTTP status
    TransportError(String),
}

impl FetchOutcome {
    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Success(_) => "success",
            FetchOutcome::NoData(_) => "no_data",
            FetchOutcome::Blocked(_) => "blocked",
            FetchOutcome::TransportError(_) => "transport_error",
        }
    }
}
