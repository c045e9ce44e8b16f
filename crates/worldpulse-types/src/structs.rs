//! The normalized event schema.
//!
//! Every source adapter converts its raw API response into [`Event`]
//! values. The core treats `payload` as opaque; only sources and display
//! layers look inside it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AlertLevel, Category, ColorCode, StormLevel};
use crate::ids::EventId;

/// Severity at or above which an event is considered prominent.
///
/// Observers auto-feature the first event of a batch that reaches it.
pub const FEATURED_SEVERITY_THRESHOLD: f64 = 5.0;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A point on the Earth's surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoLocation {
    /// Latitude in degrees, north positive.
    pub lat: f64,
    /// Longitude in degrees, east positive.
    pub lon: f64,
    /// Display name of the place or region.
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single observation produced by a source adapter.
///
/// The JSON field names `type` and `data` are kept for compatibility with
/// existing dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Identity within a cache or store.
    pub id: EventId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The kind of phenomenon.
    #[serde(rename = "type")]
    pub category: Category,
    /// Where the event happened, if it has a ground location.
    pub location: Option<GeoLocation>,
    /// Prominence on a 0-10 scale; `None` means not applicable.
    pub severity: Option<f64>,
    /// Short display title.
    pub title: Option<String>,
    /// Longer display text.
    pub description: Option<String>,
    /// Source-specific data.
    #[serde(rename = "data", default)]
    pub payload: EventPayload,
}

impl Event {
    /// Create an event with no location, severity, text, or payload.
    pub fn new(id: impl Into<EventId>, timestamp: i64, category: Category) -> Self {
        Self {
            id: id.into(),
            timestamp,
            category,
            location: None,
            severity: None,
            title: None,
            description: None,
            payload: EventPayload::default(),
        }
    }

    /// Set the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: f64) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Whether this event should take over the featured slot of an
    /// observer. Missing severity counts as zero.
    pub fn is_prominent(&self) -> bool {
        self.severity.unwrap_or(0.0) >= FEATURED_SEVERITY_THRESHOLD
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Source-specific event data.
///
/// On the wire every variant is a plain JSON object; the variant is
/// recovered from the set of fields present. A typed variant only matches
/// when the object carries exactly its fields, so an object with extra
/// keys lands in [`EventPayload::Other`] with every key kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum EventPayload {
    /// USGS earthquake details.
    Earthquake(EarthquakeData),
    /// USGS volcano notice details.
    Volcano(VolcanoData),
    /// NASA near-Earth object close approach.
    Asteroid(AsteroidData),
    /// ISS orbital state.
    Iss(IssData),
    /// NOAA geomagnetic reading.
    Aurora(AuroraData),
    /// Computed planet or moon visibility.
    Planet(PlanetData),
    /// Open key/value data from sources without a typed payload.
    Other(BTreeMap<String, serde_json::Value>),
}

impl Default for EventPayload {
    fn default() -> Self {
        Self::Other(BTreeMap::new())
    }
}

/// Payload of an earthquake event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct EarthquakeData {
    /// Moment magnitude.
    pub magnitude: f64,
    /// Hypocenter depth in kilometres.
    pub depth: f64,
    /// USGS place description.
    pub region: String,
}

/// Payload of a volcano event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct VolcanoData {
    /// Volcano name.
    pub volcano_name: String,
    /// Ground-based alert level.
    pub alert_level: AlertLevel,
    /// Aviation color code.
    pub color_code: ColorCode,
}

/// Payload of an asteroid close-approach event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct AsteroidData {
    /// Object designation without parentheses.
    pub name: String,
    /// Minimum estimated diameter in metres.
    pub diameter_min: f64,
    /// Maximum estimated diameter in metres.
    pub diameter_max: f64,
    /// Relative velocity in km/h.
    pub velocity: f64,
    /// Miss distance in kilometres.
    pub miss_distance: f64,
    /// NASA potentially-hazardous flag.
    pub hazardous: bool,
    /// Close approach date (`YYYY-MM-DD`).
    pub approach_date: String,
}

/// Payload of an ISS position event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct IssData {
    /// Altitude in kilometres.
    pub altitude: f64,
    /// Orbital speed in km/h.
    pub velocity: f64,
    /// `daylight` or `eclipsed`.
    pub visibility: String,
}

/// Payload of an aurora event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct AuroraData {
    /// Planetary K-index.
    pub kp_index: f64,
    /// Storm classification.
    pub storm_level: StormLevel,
    /// Hemisphere the reading applies to.
    pub hemisphere: String,
}

/// Payload of a planet or moon visibility event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[ts(export, export_to = "bindings/")]
pub struct PlanetData {
    /// Body name (`Venus`, `Moon`, ...).
    pub planet_name: String,
    /// Zodiac constellation the body currently sits in.
    pub constellation: String,
    /// Apparent visual magnitude.
    pub magnitude: f64,
    /// Approximate altitude above the horizon in degrees.
    pub altitude: f64,
    /// Approximate azimuth in degrees.
    pub azimuth: f64,
    /// Approximate rise time (`~HH:00`).
    pub rise_time: String,
    /// Approximate set time (`~HH:00`).
    pub set_time: String,
    /// Lunar phase in `[0, 1)`, moon only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub phase: Option<f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn event_uses_wire_field_names() {
        let event = Event::new("quake-1", 1_700_000_000_000, Category::Earthquake)
            .with_severity(3.0)
            .with_title("M4.1 - Somewhere");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "earthquake");
        assert_eq!(json["id"], "quake-1");
        assert!(json["data"].is_object());
        assert!(json.get("category").is_none());
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn minimal_client_event_deserializes() {
        let raw = r#"{
            "id": "socket-test-1",
            "timestamp": 1700000000000,
            "type": "earthquake",
            "location": null,
            "title": "Socket Test",
            "data": {}
        }"#;
        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.id.as_str(), "socket-test-1");
        assert_eq!(event.severity, None);
        assert_eq!(event.payload, EventPayload::Other(BTreeMap::new()));
    }

    #[test]
    fn payload_shape_selects_variant() {
        let raw = r#"{"magnitude": 4.5, "depth": 10.0, "region": "Alaska"}"#;
        let payload: EventPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, EventPayload::Earthquake(_)));

        let raw = r#"{"kpIndex": 5.33, "stormLevel": "minor_storm", "hemisphere": "both"}"#;
        let payload: EventPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, EventPayload::Aurora(_)));

        let raw = r#"{"headline": "something else"}"#;
        let payload: EventPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, EventPayload::Other(_)));

        let raw = r#"{"planetName": "Moon", "constellation": "Leo", "magnitude": -12.0,
            "altitude": 45.0, "azimuth": 180.0, "riseTime": "Varies", "setTime": "Varies",
            "phase": 0.5}"#;
        let payload: EventPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, EventPayload::Planet(PlanetData { phase: Some(_), .. })));
    }

    #[test]
    fn extra_keys_keep_payload_open() {
        let mut data = BTreeMap::new();
        data.insert("magnitude".to_owned(), serde_json::json!(4.5));
        data.insert("depth".to_owned(), serde_json::json!(10.0));
        data.insert("region".to_owned(), serde_json::json!("Alaska"));
        data.insert("felt".to_owned(), serde_json::json!(120));

        let mut event = Event::new("quake-felt", 1_700_000_000_000, Category::Earthquake);
        event.payload = EventPayload::Other(data);

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        match back.payload {
            EventPayload::Other(map) => assert_eq!(map["felt"], 120),
            other => panic!("expected open payload, got {other:?}"),
        }
    }

    #[test]
    fn typed_payload_round_trips() {
        let mut event = Event::new("quake-typed", 1_700_000_000_000, Category::Earthquake);
        event.payload = EventPayload::Earthquake(EarthquakeData {
            magnitude: 4.5,
            depth: 10.0,
            region: "Alaska".to_owned(),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn prominence_uses_threshold() {
        let quiet = Event::new("a", 0, Category::Iss);
        assert!(!quiet.is_prominent());
        assert!(!quiet.clone().with_severity(4.9).is_prominent());
        assert!(quiet.with_severity(5.0).is_prominent());
    }
}
