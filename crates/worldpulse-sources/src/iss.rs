//! International Space Station position.
//!
//! Queries wheretheiss.at for a full orbital state and falls back to
//! open-notify, which reports position only. Both produce the same stable
//! event id, so every poll replaces the previous position in the cache.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{Category, Event, EventPayload, GeoLocation, IssData};

use crate::http::get_json;

const WHERE_THE_ISS_URL: &str = "https://api.wheretheiss.at/v1/satellites/25544";
const OPEN_NOTIFY_URL: &str = "http://api.open-notify.org/iss-now.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Average altitude in km, used when only the position is known.
const AVERAGE_ALTITUDE_KM: f64 = 408.0;
/// Average orbital speed in km/h, used when only the position is known.
const AVERAGE_VELOCITY_KMH: f64 = 27_600.0;

const EVENT_ID: &str = "iss-position";
const STATION_NAME: &str = "International Space Station";

/// Configuration key of this source.
pub const KEY: &str = "iss";

/// Response of the wheretheiss.at satellite endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WhereTheIssResponse {
    /// Degrees north.
    pub latitude: Option<f64>,
    /// Degrees east.
    pub longitude: Option<f64>,
    /// Kilometres.
    pub altitude: Option<f64>,
    /// Kilometres per hour.
    #[serde(default)]
    pub velocity: f64,
    /// `daylight` or `eclipsed`.
    #[serde(default)]
    pub visibility: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

/// Response of the open-notify position endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenNotifyResponse {
    /// `success` when the position is valid.
    pub message: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Position as decimal strings.
    pub iss_position: Option<OpenNotifyPosition>,
}

/// Position reported by open-notify.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenNotifyPosition {
    /// Degrees north, as a decimal string.
    pub latitude: String,
    /// Degrees east, as a decimal string.
    pub longitude: String,
}

/// Whichever upstream answered.
#[derive(Debug, Clone)]
pub enum IssFix {
    /// Full orbital state.
    WhereTheIss(WhereTheIssResponse),
    /// Position only.
    OpenNotify(OpenNotifyResponse),
}

/// ISS tracker source.
pub struct IssSource {
    client: reqwest::Client,
}

impl IssSource {
    /// Create the source over a shared client.
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn where_the_iss_is_valid(raw: &WhereTheIssResponse) -> bool {
    raw.latitude.is_some() && raw.longitude.is_some() && raw.altitude.is_some()
}

impl EventSource for IssSource {
    type Raw = IssFix;

    fn name(&self) -> &str {
        "ISS Tracker"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Iss
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(10))
    }

    async fn fetch(&self) -> Result<IssFix, SourceError> {
        match get_json::<WhereTheIssResponse>(
            &self.client,
            WHERE_THE_ISS_URL,
            &[],
            REQUEST_TIMEOUT,
        )
        .await
        {
            Ok(primary) if where_the_iss_is_valid(&primary) => {
                return Ok(IssFix::WhereTheIss(primary));
            }
            Ok(_) => warn!("wheretheiss.at returned an incomplete position, trying open-notify"),
            Err(e) => warn!(error = %e, "wheretheiss.at unavailable, trying open-notify"),
        }
        get_json(&self.client, OPEN_NOTIFY_URL, &[], REQUEST_TIMEOUT)
            .await
            .map(IssFix::OpenNotify)
    }

    fn validate(&self, raw: &IssFix) -> bool {
        match raw {
            IssFix::WhereTheIss(r) => where_the_iss_is_valid(r),
            IssFix::OpenNotify(r) => r.message == "success" && r.iss_position.is_some(),
        }
    }

    fn transform(&self, raw: IssFix) -> Result<Vec<Event>, SourceError> {
        let event = match raw {
            IssFix::WhereTheIss(r) => {
                let (Some(lat), Some(lon), Some(altitude)) = (r.latitude, r.longitude, r.altitude)
                else {
                    return Err(SourceError::Invalid("ISS position incomplete".to_owned()));
                };
                position_event(
                    r.timestamp,
                    lat,
                    lon,
                    format!("Alt: {altitude:.0} km | Speed: {:.0} km/h", r.velocity),
                    IssData {
                        altitude,
                        velocity: r.velocity,
                        visibility: r.visibility,
                    },
                )
            }
            IssFix::OpenNotify(r) => {
                let position = r
                    .iss_position
                    .ok_or_else(|| SourceError::Invalid("ISS position missing".to_owned()))?;
                let lat = parse_degrees(&position.latitude)?;
                let lon = parse_degrees(&position.longitude)?;
                position_event(
                    r.timestamp,
                    lat,
                    lon,
                    format!("Current position: {lat:.2}°, {lon:.2}°"),
                    IssData {
                        altitude: AVERAGE_ALTITUDE_KM,
                        velocity: AVERAGE_VELOCITY_KMH,
                        visibility: "daylight".to_owned(),
                    },
                )
            }
        };
        Ok(vec![event])
    }
}

fn parse_degrees(text: &str) -> Result<f64, SourceError> {
    text.trim()
        .parse()
        .map_err(|e| SourceError::Decode(format!("bad ISS coordinate {text:?}: {e}")))
}

fn position_event(
    timestamp_secs: i64,
    lat: f64,
    lon: f64,
    description: String,
    data: IssData,
) -> Event {
    let mut event = Event::new(EVENT_ID, timestamp_secs.saturating_mul(1000), Category::Iss)
        .with_severity(0.0)
        .with_title("ISS - International Space Station");
    event.location = Some(GeoLocation {
        lat,
        lon,
        name: Some(STATION_NAME.to_owned()),
    });
    event.description = Some(description);
    event.payload = EventPayload::Iss(data);
    event
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::float_cmp,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn source() -> IssSource {
        IssSource::new(reqwest::Client::new())
    }

    #[test]
    fn transforms_where_the_iss() {
        let raw: WhereTheIssResponse = serde_json::from_str(
            r#"{
                "name": "iss", "id": 25544,
                "latitude": 12.5, "longitude": -45.25, "altitude": 419.7,
                "velocity": 27587.3, "visibility": "eclipsed",
                "footprint": 4500.1, "timestamp": 1700000000, "units": "kilometers"
            }"#,
        )
        .unwrap();
        let raw = IssFix::WhereTheIss(raw);
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id.as_str(), "iss-position");
        assert_eq!(event.timestamp, 1_700_000_000_000);
        assert_eq!(event.severity, Some(0.0));
        assert_eq!(
            event.description.as_deref(),
            Some("Alt: 420 km | Speed: 27587 km/h")
        );
        let EventPayload::Iss(data) = &event.payload else {
            panic!("expected ISS payload");
        };
        assert_eq!(data.visibility, "eclipsed");
    }

    #[test]
    fn incomplete_where_the_iss_is_invalid() {
        let raw: WhereTheIssResponse =
            serde_json::from_str(r#"{"latitude": 1.0, "timestamp": 1}"#).unwrap();
        assert!(!source().validate(&IssFix::WhereTheIss(raw)));
    }

    #[test]
    fn transforms_open_notify_with_averages() {
        let raw: OpenNotifyResponse = serde_json::from_str(
            r#"{
                "message": "success",
                "timestamp": 1700000000,
                "iss_position": {"latitude": "-51.6416", "longitude": "120.0128"}
            }"#,
        )
        .unwrap();
        let raw = IssFix::OpenNotify(raw);
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        let event = &events[0];
        let location = event.location.as_ref().unwrap();
        assert!((location.lat - -51.6416).abs() < 1e-9);
        assert_eq!(
            event.description.as_deref(),
            Some("Current position: -51.64°, 120.01°")
        );
        let EventPayload::Iss(data) = &event.payload else {
            panic!("expected ISS payload");
        };
        assert_eq!(data.altitude, 408.0);
        assert_eq!(data.velocity, 27_600.0);
    }

    #[test]
    fn open_notify_failure_message_is_invalid() {
        let raw: OpenNotifyResponse =
            serde_json::from_str(r#"{"message": "failure", "timestamp": 0}"#).unwrap();
        assert!(!source().validate(&IssFix::OpenNotify(raw)));
    }

    #[test]
    fn bad_coordinate_string_is_decode_error() {
        let raw = IssFix::OpenNotify(OpenNotifyResponse {
            message: "success".to_owned(),
            timestamp: 0,
            iss_position: Some(OpenNotifyPosition {
                latitude: "north".to_owned(),
                longitude: "0".to_owned(),
            }),
        });
        assert!(matches!(
            source().transform(raw),
            Err(SourceError::Decode(_))
        ));
    }
}
