//! Hub-to-observer messages and the read-only status records.
//!
//! WebSocket frames carry a [`HubMessage`] serialized as
//! `{"event": "<name>", "data": {...}}`, where `<name>` is one of
//! `events:initial`, `events:new`, or `collector:disabled`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Category, DisabledReason};
use crate::structs::Event;

/// A batch or snapshot of events with the time it was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventsPayload {
    /// The events, most recent merge first.
    pub events: Vec<Event>,
    /// Milliseconds since the Unix epoch when the hub sent the message.
    pub timestamp: i64,
}

/// Notification that a source adapter tripped its circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisabledNotice {
    /// Adapter name.
    pub name: String,
    /// Why it was disabled.
    pub reason: Option<DisabledReason>,
    /// Milliseconds since the Unix epoch when the adapter was disabled.
    pub timestamp: i64,
}

/// A message pushed from the hub to every connected observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data")]
#[ts(export, export_to = "bindings/")]
pub enum HubMessage {
    /// Full cache contents, sent once per new connection.
    #[serde(rename = "events:initial")]
    Initial(EventsPayload),
    /// One adapter batch, as fetched.
    #[serde(rename = "events:new")]
    New(EventsPayload),
    /// An adapter was disabled.
    #[serde(rename = "collector:disabled")]
    CollectorDisabled(DisabledNotice),
}

impl HubMessage {
    /// The wire event name of this message.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Initial(_) => "events:initial",
            Self::New(_) => "events:new",
            Self::CollectorDisabled(_) => "collector:disabled",
        }
    }
}

/// Health of one source adapter as reported by the status surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatusRecord {
    /// Adapter name.
    pub name: String,
    /// Category of the events it produces.
    #[serde(rename = "type")]
    pub category: Category,
    /// False once the circuit breaker has tripped.
    pub enabled: bool,
    /// Whether the polling timer is active.
    pub running: bool,
    /// Milliseconds since the Unix epoch of the last successful fetch, 0 if never.
    pub last_fetch: i64,
    /// Consecutive failures since the last success.
    pub error_count: u32,
    /// Polling interval in milliseconds.
    pub interval_ms: u64,
    /// Consecutive failures that disable the adapter.
    pub max_errors: u32,
    /// Set once the adapter is disabled.
    pub disabled_reason: Option<DisabledReason>,
    /// Enabled with no outstanding failures.
    pub healthy: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::Category;

    #[test]
    fn hub_message_is_adjacently_tagged() {
        let msg = HubMessage::New(EventsPayload {
            events: vec![Event::new("q1", 1, Category::Earthquake)],
            timestamp: 42,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "events:new");
        assert_eq!(json["data"]["timestamp"], 42);
        assert_eq!(json["data"]["events"][0]["id"], "q1");
        assert_eq!(msg.event_name(), "events:new");
    }

    #[test]
    fn disabled_notice_round_trips_through_text() {
        let text = r#"{"event":"collector:disabled","data":{"name":"ISS Tracker","reason":"max_errors","timestamp":7}}"#;
        let msg: HubMessage = serde_json::from_str(text).unwrap();
        assert_eq!(
            msg,
            HubMessage::CollectorDisabled(DisabledNotice {
                name: String::from("ISS Tracker"),
                reason: Some(DisabledReason::MaxErrors),
                timestamp: 7,
            })
        );
    }

    #[test]
    fn status_record_is_camel_case() {
        let record = StatusRecord {
            name: String::from("USGS Earthquakes"),
            category: Category::Earthquake,
            enabled: true,
            running: true,
            last_fetch: 0,
            error_count: 0,
            interval_ms: 300_000,
            max_errors: 5,
            disabled_reason: None,
            healthy: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "earthquake");
        assert_eq!(json["lastFetch"], 0);
        assert_eq!(json["errorCount"], 0);
        assert_eq!(json["intervalMs"], 300_000);
    }
}
