//! Integration tests for the hub endpoints.
//!
//! REST tests drive the `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The `WebSocket` test binds an ephemeral port and
//! connects a real client.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use worldpulse_core::adapter::Adapter;
use worldpulse_core::config::HubConfig;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_hub::router::build_router;
use worldpulse_hub::startup::spawn_hub;
use worldpulse_hub::state::HubState;
use worldpulse_types::{Category, Event, HubMessage};

/// A source that never reaches its upstream.
struct UnreachableSource;

impl EventSource for UnreachableSource {
    type Raw = ();

    fn name(&self) -> &str {
        "Unreachable"
    }

    fn key(&self) -> &str {
        "unreachable"
    }

    fn category(&self) -> Category {
        Category::Volcano
    }

    async fn fetch(&self) -> Result<(), SourceError> {
        Err(SourceError::Http(String::from("connection refused")))
    }

    fn validate(&self, _raw: &()) -> bool {
        true
    }

    fn transform(&self, _raw: ()) -> Result<Vec<Event>, SourceError> {
        Ok(Vec::new())
    }
}

fn sample_events() -> Vec<Event> {
    vec![
        Event::new("quake-1", 1_700_000_000_000, Category::Earthquake)
            .with_title("M6.1 - Offshore")
            .with_severity(7.0),
        Event::new("iss-position", 1_700_000_000_500, Category::Iss).with_severity(0.0),
        Event::new("quake-2", 1_700_000_001_000, Category::Earthquake)
            .with_title("M2.0 - Inland")
            .with_severity(2.0),
    ]
}

fn make_test_state() -> Arc<HubState> {
    let state = Arc::new(HubState::new(100));
    state.ingest("fixtures", sample_events());
    state
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<HubState>, uri: &str) -> (StatusCode, Body) {
    let app = build_router(state, "*");
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    (response.status(), response.into_body())
}

fn ids(json: &Value) -> Vec<&str> {
    json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// /api/events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_events_returns_cache_in_order() {
    let (status, body) = get(make_test_state(), "/api/events").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(ids(&json), vec!["quake-1", "iss-position", "quake-2"]);
    assert!(json["timestamp"].is_string());
    assert_eq!(json["events"][0]["type"], "earthquake");
}

#[tokio::test]
async fn list_events_filters_by_type() {
    let (status, body) = get(make_test_state(), "/api/events?type=earthquake").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(ids(&json), vec!["quake-1", "quake-2"]);
}

#[tokio::test]
async fn list_events_respects_limit() {
    let (status, body) = get(make_test_state(), "/api/events?limit=2").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(ids(&json), vec!["quake-1", "iss-position"]);
}

#[tokio::test]
async fn list_events_rejects_zero_limit() {
    let (status, body) = get(make_test_state(), "/api/events?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = body_to_json(body).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn list_events_rejects_unknown_type() {
    let (status, body) = get(make_test_state(), "/api/events?type=meteor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = body_to_json(body).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("meteor"));
}

#[tokio::test]
async fn list_events_rejects_non_numeric_limit() {
    let uris = [
        "/api/events?limit=abc",
        "/api/events?limit=-1",
        "/api/events?type=iss&limit=2x",
    ];
    for uri in uris {
        let (status, body) = get(make_test_state(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");

        let json = body_to_json(body).await;
        assert_eq!(json["status"], 400, "{uri}");
        assert!(json["error"].as_str().unwrap().contains("limit"), "{uri}");
    }
}

#[tokio::test]
async fn list_events_combines_type_and_limit() {
    let (status, body) = get(make_test_state(), "/api/events?type=earthquake&limit=1").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(ids(&json), vec!["quake-1"]);
}

#[tokio::test]
async fn list_events_empty_cache() {
    let (status, body) = get(Arc::new(HubState::default()), "/api/events").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert!(json["events"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// /api/status and /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_sources_and_cache_size() {
    let state = make_test_state();
    let adapter = Adapter::with_settings(
        UnreachableSource,
        AdapterSettings {
            interval: Duration::from_secs(900),
            max_errors: 2,
        },
    );
    adapter.poll_once(&*state).await;
    state.register_sources(vec![Arc::clone(adapter.health())]).await;

    let (status, body) = get(Arc::clone(&state), "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["status"], "ready");
    assert_eq!(json["eventCount"], 3);
    assert_eq!(json["collectorsTotal"], 1);
    assert_eq!(json["collectorsHealthy"], 0);

    let record = &json["collectors"][0];
    assert_eq!(record["name"], "Unreachable");
    assert_eq!(record["enabled"], true);
    assert_eq!(record["errorCount"], 1);
    assert_eq!(record["intervalMs"], 900_000);
    assert_eq!(record["maxErrors"], 2);
}

#[tokio::test]
async fn status_shows_disabled_source() {
    let state = make_test_state();
    let adapter = Adapter::with_settings(
        UnreachableSource,
        AdapterSettings {
            interval: Duration::from_secs(60),
            max_errors: 1,
        },
    );
    adapter.poll_once(&*state).await;
    state.register_sources(vec![Arc::clone(adapter.health())]).await;

    let (_, body) = get(state, "/api/status").await;
    let json = body_to_json(body).await;
    let record = &json["collectors"][0];
    assert_eq!(record["enabled"], false);
    assert_eq!(record["healthy"], false);
    assert_eq!(record["disabledReason"], "max_errors");
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, body) = get(make_test_state(), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["observers"], 0);
    assert_eq!(json["collectorsTotal"], 0);
    assert!(json["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn index_serves_html() {
    let (status, body) = get(make_test_state(), "/").await;
    assert_eq!(status, StatusCode::OK);

    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("WorldPulse Hub"));
    assert!(html.contains("3 cached events"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = get(make_test_state(), "/api/planets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

async fn next_message<S>(stream: &mut S) -> HubMessage
where
    S: futures::Stream<
            Item = Result<
                tokio_tungstenite::tungstenite::Message,
                tokio_tungstenite::tungstenite::Error,
            >,
        > + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if frame.is_text() {
            return serde_json::from_str(frame.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_sends_snapshot_then_batches() {
    let state = make_test_state();
    let shutdown = CancellationToken::new();
    let config = HubConfig {
        host: String::from("127.0.0.1"),
        port: 0,
        cors_origin: String::from("*"),
    };
    let hub = spawn_hub(&config, Arc::clone(&state), shutdown.clone())
        .await
        .unwrap();

    let url = format!("ws://{}/ws/events", hub.addr);
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let HubMessage::Initial(initial) = next_message(&mut socket).await else {
        panic!("expected events:initial first");
    };
    let snapshot: Vec<&str> = initial.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(snapshot, vec!["quake-1", "iss-position", "quake-2"]);

    state.ingest(
        "fixtures",
        vec![Event::new("quake-3", 1_700_000_002_000, Category::Earthquake).with_severity(5.0)],
    );

    let HubMessage::New(batch) = next_message(&mut socket).await else {
        panic!("expected events:new");
    };
    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].id.as_str(), "quake-3");

    let adapter = Adapter::with_settings(
        UnreachableSource,
        AdapterSettings {
            interval: Duration::from_secs(60),
            max_errors: 1,
        },
    );
    adapter.poll_once(&*state).await;

    let HubMessage::CollectorDisabled(notice) = next_message(&mut socket).await else {
        panic!("expected collector:disabled");
    };
    assert_eq!(notice.name, "Unreachable");

    drop(socket);
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), hub.handle)
        .await
        .unwrap()
        .unwrap();
}
