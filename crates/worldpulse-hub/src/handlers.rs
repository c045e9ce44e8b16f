//! REST endpoint handlers for the hub.
//!
//! All handlers read from the shared [`HubState`]; none of them touch the
//! adapters directly.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/events` | Cached events (optionally filtered) |
//! | `GET` | `/api/status` | Adapter health and cache size |
//! | `GET` | `/health` | Liveness with uptime and observer count |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use serde::{Deserialize, Serialize};
use worldpulse_types::{Category, Event, StatusRecord};

use crate::error::HubError;
use crate::state::HubState;

fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /api/events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Cached events, newest merge first.
    pub events: Vec<Event>,
    /// Response time (RFC 3339).
    pub timestamp: String,
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always `ready`.
    pub status: String,
    /// Response time (RFC 3339).
    pub timestamp: String,
    /// One record per registered adapter.
    pub collectors: Vec<StatusRecord>,
    /// Number of registered adapters.
    pub collectors_total: usize,
    /// Adapters enabled with no outstanding failures.
    pub collectors_healthy: usize,
    /// Events in the cache.
    pub event_count: usize,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Response time (RFC 3339).
    pub timestamp: String,
    /// Seconds since the hub started.
    pub uptime_seconds: u64,
    /// One record per registered adapter.
    pub collectors: Vec<StatusRecord>,
    /// Number of registered adapters.
    pub collectors_total: usize,
    /// Adapters enabled with no outstanding failures.
    pub collectors_healthy: usize,
    /// Connected `WebSocket` observers.
    pub observers: usize,
}

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only events of this category (lowercase wire name).
    #[serde(rename = "type")]
    pub category: Option<String>,
    /// Maximum number of events to return (at least 1).
    pub limit: Option<String>,
}

/// Parse a `type` query value into a [`Category`].
fn parse_category(s: &str) -> Result<Category, HubError> {
    Category::from_wire(s)
        .ok_or_else(|| HubError::InvalidQuery(format!("unknown event type: {s}")))
}

/// Parse a `limit` query value; it must be a positive integer.
fn parse_limit(s: &str) -> Result<usize, HubError> {
    match s.parse::<usize>() {
        Ok(0) => Err(HubError::InvalidQuery("limit must be at least 1".to_owned())),
        Ok(n) => Ok(n),
        Err(_) => Err(HubError::InvalidQuery(format!("invalid limit: {s}"))),
    }
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing hub status and API links.
pub async fn index(State(state): State<Arc<HubState>>) -> impl IntoResponse {
    let statuses = state.statuses().await;
    let healthy = statuses.iter().filter(|s| s.healthy).count();
    let rows: String = statuses
        .iter()
        .map(|s| {
            let label = if s.healthy {
                "ok"
            } else if s.enabled {
                "degraded"
            } else {
                "disabled"
            };
            format!(
                "<li>{} <span class=\"{label}\">{label}</span> errors={}</li>\n",
                s.name, s.error_count
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>WorldPulse Hub</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: monospace; padding: 2rem; }}
        h1 {{ color: #58a6ff; }}
        a {{ color: #58a6ff; }}
        .ok {{ color: #3fb950; }}
        .degraded {{ color: #d29922; }}
        .disabled {{ color: #f85149; }}
    </style>
</head>
<body>
    <h1>WorldPulse Hub</h1>
    <p>{events} cached events | {observers} observers | {healthy}/{total} sources healthy</p>
    <ul>
{rows}    </ul>
    <p><a href="/api/events">/api/events</a> | <a href="/api/status">/api/status</a> | <a href="/health">/health</a> | <code>ws://&lt;host&gt;/ws/events</code></p>
</body>
</html>"#,
        events = state.event_count(),
        observers = state.observer_count(),
        total = statuses.len(),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Return the cached events.
///
/// # Query Parameters
///
/// - `type`: only events of this category
/// - `limit`: maximum number of events (at least 1)
pub async fn list_events(
    State(state): State<Arc<HubState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, HubError> {
    let category = params.category.as_deref().map(parse_category).transpose()?;
    let limit = params.limit.as_deref().map(parse_limit).transpose()?.unwrap_or(usize::MAX);
    let events = state
        .snapshot()
        .into_iter()
        .filter(|e| category.is_none_or(|c| e.category == c))
        .take(limit)
        .collect();

    Ok(Json(EventsResponse {
        events,
        timestamp: rfc3339_now(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return adapter health and the cache size.
pub async fn get_status(State(state): State<Arc<HubState>>) -> Json<StatusResponse> {
    let collectors = state.statuses().await;
    Json(StatusResponse {
        status: "ready".to_owned(),
        timestamp: rfc3339_now(),
        collectors_total: collectors.len(),
        collectors_healthy: collectors.iter().filter(|s| s.healthy).count(),
        collectors,
        event_count: state.event_count(),
    })
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health(State(state): State<Arc<HubState>>) -> Json<HealthResponse> {
    let collectors = state.statuses().await;
    Json(HealthResponse {
        status: "ok".to_owned(),
        timestamp: rfc3339_now(),
        uptime_seconds: state.uptime().as_secs(),
        collectors_total: collectors.len(),
        collectors_healthy: collectors.iter().filter(|s| s.healthy).count(),
        collectors,
        observers: state.observer_count(),
    })
}
