//! Hub connection loop.
//!
//! Connects to the hub's `WebSocket`, feeds every message into a local
//! [`ObserverStore`], and reconnects after a fixed delay when the
//! connection drops. The store survives reconnects; each new connection
//! starts with a fresh `events:initial` snapshot.

use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use worldpulse_core::store::ObserverStore;
use worldpulse_types::{HubMessage, StatusRecord};

use crate::args::{Args, HubEndpoints};
use crate::error::WatchError;

/// Timeout for the status probe.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// The parts of `GET /api/status` the watcher reports.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusSummary {
    collectors: Vec<StatusRecord>,
    collectors_total: usize,
    collectors_healthy: usize,
    event_count: usize,
}

/// Follow the hub until reconnect attempts run out.
///
/// The attempt counter resets after every successful connection.
///
/// # Errors
///
/// Returns [`WatchError::Http`] if the HTTP client cannot be built, or
/// [`WatchError::ReconnectExhausted`] after `args.attempts` consecutive
/// failed connection attempts.
pub async fn run(args: &Args, endpoints: &HubEndpoints) -> Result<(), WatchError> {
    let http = reqwest::Client::builder()
        .timeout(STATUS_TIMEOUT)
        .build()
        .map_err(|e| WatchError::Http(e.to_string()))?;
    let mut store = ObserverStore::new(args.capacity);
    let delay = Duration::from_millis(args.delay_ms);
    let mut failures: u32 = 0;

    loop {
        match connect_async(endpoints.ws.as_str()).await {
            Ok((stream, _)) => {
                failures = 0;
                info!(url = %endpoints.ws, "Connected to hub");
                probe_status(&http, &endpoints.status).await;
                match follow(stream, &mut store).await {
                    Ok(()) => info!(events = store.events().len(), "Hub closed the connection"),
                    Err(e) => warn!(error = %e, "Connection lost"),
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                warn!(
                    attempt = failures,
                    max_attempts = args.attempts,
                    error = %e,
                    "Failed to connect to hub"
                );
                if failures >= args.attempts {
                    return Err(WatchError::ReconnectExhausted { attempts: failures });
                }
            }
        }
        tokio::time::sleep(delay).await;
    }
}

/// Fetch `/api/status` once and log collector health.
///
/// A failed probe is logged and otherwise ignored.
async fn probe_status(http: &reqwest::Client, url: &str) {
    let response = match http.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "Status probe failed");
            return;
        }
    };
    let summary: StatusSummary = match response.json().await {
        Ok(s) => s,
        Err(e) => {
            warn!(url, error = %e, "Status probe returned an unexpected body");
            return;
        }
    };

    info!(
        healthy = summary.collectors_healthy,
        total = summary.collectors_total,
        events = summary.event_count,
        "Hub status"
    );
    for collector in &summary.collectors {
        if collector.healthy {
            debug!(source = %collector.name, "Source healthy");
        } else {
            warn!(
                source = %collector.name,
                enabled = collector.enabled,
                error_count = collector.error_count,
                reason = ?collector.disabled_reason,
                "Source unhealthy"
            );
        }
    }
}

/// Apply frames from one connection until it closes.
///
/// # Errors
///
/// Returns [`WatchError::Connection`] if the stream yields an error.
pub async fn follow<S>(mut stream: S, store: &mut ObserverStore) -> Result<(), WatchError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame.map_err(|e| WatchError::Connection(e.to_string()))? {
            Message::Text(text) => {
                if let Err(e) = apply_frame(store, text.as_str()) {
                    warn!(error = %e, "Ignoring malformed frame");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

/// Decode one text frame and apply it to `store`.
///
/// Returns whether the featured event changed.
///
/// # Errors
///
/// Returns [`WatchError::Protocol`] if the frame is not a hub message.
pub fn apply_frame(store: &mut ObserverStore, text: &str) -> Result<bool, WatchError> {
    let message: HubMessage =
        serde_json::from_str(text).map_err(|e| WatchError::Protocol(e.to_string()))?;

    match &message {
        HubMessage::Initial(payload) => {
            info!(events = payload.events.len(), "Snapshot received");
        }
        HubMessage::New(payload) => {
            debug!(events = payload.events.len(), "Batch received");
        }
        HubMessage::CollectorDisabled(notice) => {
            warn!(source = %notice.name, reason = ?notice.reason, "Source disabled on hub");
        }
    }

    let changed = store.apply_message(message);
    if changed {
        if let Some(featured) = store.featured() {
            info!(
                id = featured.id.as_str(),
                category = ?featured.category,
                severity = featured.severity.unwrap_or(0.0),
                title = featured.title.as_deref().unwrap_or(""),
                "Featured event"
            );
        }
    }
    Ok(changed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use worldpulse_types::{Category, DisabledNotice, DisabledReason, Event, EventsPayload};

    use super::*;

    fn frame(message: &HubMessage) -> String {
        serde_json::to_string(message).unwrap()
    }

    fn quake(id: &str, severity: f64) -> Event {
        Event::new(id, 1_700_000_000_000, Category::Earthquake).with_severity(severity)
    }

    #[test]
    fn snapshot_then_batches_update_featured() {
        let mut store = ObserverStore::new(100);

        let initial = HubMessage::Initial(EventsPayload {
            events: vec![quake("q1", 2.0)],
            timestamp: 0,
        });
        assert!(apply_frame(&mut store, &frame(&initial)).unwrap());
        assert_eq!(store.featured().unwrap().id.as_str(), "q1");

        let minor = HubMessage::New(EventsPayload {
            events: vec![quake("q2", 3.0)],
            timestamp: 1,
        });
        assert!(!apply_frame(&mut store, &frame(&minor)).unwrap());

        let major = HubMessage::New(EventsPayload {
            events: vec![quake("q3", 7.0)],
            timestamp: 2,
        });
        assert!(apply_frame(&mut store, &frame(&major)).unwrap());
        assert_eq!(store.featured().unwrap().id.as_str(), "q3");
        assert_eq!(store.events().len(), 3);
    }

    #[test]
    fn disabled_notice_is_recorded() {
        let mut store = ObserverStore::default();
        let notice = HubMessage::CollectorDisabled(DisabledNotice {
            name: String::from("NASA Asteroids"),
            reason: Some(DisabledReason::MaxErrors),
            timestamp: 0,
        });
        assert!(!apply_frame(&mut store, &frame(&notice)).unwrap());
        assert!(store.disabled_sources().contains("NASA Asteroids"));
    }

    #[test]
    fn malformed_frame_is_protocol_error() {
        let mut store = ObserverStore::default();
        let err = apply_frame(&mut store, r#"{"event":"events:unknown","data":{}}"#).unwrap_err();
        assert!(matches!(err, WatchError::Protocol(_)));
    }

    #[tokio::test]
    async fn follow_applies_frames_until_close() {
        let mut store = ObserverStore::default();
        let initial = HubMessage::Initial(EventsPayload {
            events: vec![quake("q1", 1.0)],
            timestamp: 0,
        });
        let batch = HubMessage::New(EventsPayload {
            events: vec![quake("q2", 6.0)],
            timestamp: 1,
        });
        let late = HubMessage::New(EventsPayload {
            events: vec![quake("q3", 9.0)],
            timestamp: 2,
        });
        let frames: Vec<Result<Message, tungstenite::Error>> = vec![
            Ok(Message::text(frame(&initial))),
            Ok(Message::text("not json")),
            Ok(Message::text(frame(&batch))),
            Ok(Message::Close(None)),
            Ok(Message::text(frame(&late))),
        ];

        follow(futures::stream::iter(frames), &mut store).await.unwrap();

        let ids: Vec<&str> = store.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q1"]);
        assert_eq!(store.featured().unwrap().id.as_str(), "q2");
    }

    #[tokio::test]
    async fn follow_reports_stream_errors() {
        let mut store = ObserverStore::default();
        let frames: Vec<Result<Message, tungstenite::Error>> =
            vec![Err(tungstenite::Error::ConnectionClosed)];
        let err = follow(futures::stream::iter(frames), &mut store).await.unwrap_err();
        assert!(matches!(err, WatchError::Connection(_)));
    }
}
