use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::stats::{Snapshot, SnapshotStore, StatValue};

#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    /// How often the overlay page re-reads `/stats`
    pub overlay_poll_secs: u64,
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsResponse {
    /// "ok" once a fetch has succeeded, "loading" before that
    pub status: &'static str,
    pub present: bool,
    pub name: Option<String>,
    pub rating: Option<StatValue>,
    pub wins: Option<StatValue>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl From<Snapshot> for StatsResponse {
    fn from(s: Snapshot) -> Self {
        let present = s.is_present();
        StatsResponse {
            status: if present { "ok" } else { "loading" },
            present,
            name: s.name,
            rating: s.rating,
            wins: s.wins,
            fetched_at: s.fetched_at,
        }
    }
}

/// Build the Axum router. Every handler only reads the store; none of them
/// triggers a fetch.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stats", get(stats_handler))
        .route("/overlay", get(overlay_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /
async fn index_handler() -> &'static str {
    "csstats-overlay is online"
}

/// GET /stats
async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(state.store.read().into())
}

/// Serve the overlay page, injecting the poll interval.
async fn overlay_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = OVERLAY_HTML.replace(
        r#"<body>"#,
        &format!(r#"<body data-poll="{}">"#, state.overlay_poll_secs.saturating_mul(1000)),
    );
    Html(html)
}

/// Embedded stream overlay (HTML + CSS + JS), transparent background.
const OVERLAY_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>CS2 Stats Overlay</title>
<style>
  body { background: transparent; margin: 0; font-family: 'Segoe UI', system-ui, sans-serif; color: #fff; }
  .card { display: inline-flex; gap: 1.2rem; align-items: baseline; padding: .5rem 1rem; border-radius: 8px; background: rgba(15,17,23,.75); text-shadow: 0 1px 2px #000; }
  .name { font-weight: 600; color: #c9c9e0; }
  .rating { font-size: 1.8rem; font-weight: 800; }
  .wins { font-size: 1rem; color: #00c896; }
  .loading { color: #8888aa; }
</style>
</head>
<body>
<div class="card">
  <span class="name" id="name"></span>
  <span class="rating loading" id="rating">Loading…</span>
  <span class="wins" id="wins"></span>
</div>
<script>
const num = v => typeof v === 'number' ? v.toLocaleString('en-US') : (v ?? '–');

async function refresh() {
  try {
    const r = await fetch('/stats');
    if (!r.ok) return;
    const s = await r.json();
    const rating = document.getElementById('rating');
    if (!s.present) {
      rating.textContent = 'Loading…';
      rating.className = 'rating loading';
      return;
    }
    document.getElementById('name').textContent = s.name ?? '';
    rating.textContent = num(s.rating);
    rating.className = 'rating';
    document.getElementById('wins').textContent = num(s.wins) + ' wins';
  } catch (e) {
    // keep showing the last values
  }
}

refresh();
setInterval(refresh, Number(document.body.dataset.poll) || 60000);
</script>
</body>
</html>"#;
