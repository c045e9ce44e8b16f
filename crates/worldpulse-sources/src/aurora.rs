//! NOAA planetary K-index (space weather).
//!
//! Emits one event for the most recent one-minute Kp reading. The
//! location is the approximate latitude down to which the aurora is
//! visible at that Kp.

use std::time::Duration;

use serde::Deserialize;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{AuroraData, Category, Event, EventPayload, GeoLocation, StormLevel};

use crate::http::{get_json, leading_number, parse_utc_millis};

const KP_URL: &str = "https://services.swpc.noaa.gov/json/planetary_k_index_1m.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration key of this source.
pub const KEY: &str = "aurora";

/// One Kp reading.
#[derive(Debug, Clone, Deserialize)]
pub struct KpEntry {
    /// Reading time, UTC without zone suffix.
    pub time_tag: Option<String>,
    /// Kp value; NOAA sends a number or a string such as `"2M"`.
    pub kp: Option<serde_json::Value>,
    /// Numeric Kp index, present in newer feeds.
    #[serde(default)]
    pub kp_index: Option<f64>,
}

impl KpEntry {
    fn kp_value(&self) -> Option<f64> {
        match &self.kp {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => leading_number(s),
            _ => self.kp_index,
        }
    }
}

/// Where an aurora at a given Kp can be seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    /// Approximate equatorward latitude of visibility.
    pub latitude: f64,
    /// Region name.
    pub region: &'static str,
    /// Where people can see it.
    pub description: &'static str,
}

/// Visibility band for a Kp reading.
pub fn visibility_for(kp: f64) -> Visibility {
    if kp >= 9.0 {
        Visibility {
            latitude: 40.0,
            region: "Mid-Latitudes (40°N/S)",
            description: "Visible as far south as Spain/Northern US",
        }
    } else if kp >= 7.0 {
        Visibility {
            latitude: 50.0,
            region: "Northern Europe/Canada",
            description: "Visible across UK, Germany, Northern US",
        }
    } else if kp >= 5.0 {
        Visibility {
            latitude: 60.0,
            region: "Scandinavia/Alaska",
            description: "Visible in Iceland, Norway, Alaska",
        }
    } else {
        Visibility {
            latitude: 67.0,
            region: "Arctic Circle",
            description: "Visible in Northern Scandinavia, Northern Canada",
        }
    }
}

/// Map Kp 0-9 onto the 0-10 severity scale.
pub fn kp_severity(kp: f64) -> f64 {
    (kp / 9.0 * 10.0).clamp(0.0, 10.0)
}

/// NOAA aurora source.
pub struct AuroraSource {
    client: reqwest::Client,
}

impl AuroraSource {
    /// Create the source over a shared client.
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl EventSource for AuroraSource {
    type Raw = Vec<KpEntry>;

    fn name(&self) -> &str {
        "Aurora/Space Weather"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Aurora
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(5 * 60))
    }

    async fn fetch(&self) -> Result<Vec<KpEntry>, SourceError> {
        get_json(&self.client, KP_URL, &[], REQUEST_TIMEOUT).await
    }

    fn validate(&self, raw: &Vec<KpEntry>) -> bool {
        raw.first()
            .is_none_or(|first| first.time_tag.is_some() && first.kp.is_some())
    }

    fn transform(&self, raw: Vec<KpEntry>) -> Result<Vec<Event>, SourceError> {
        let Some(latest) = raw.into_iter().next_back() else {
            return Ok(Vec::new());
        };
        let kp = latest
            .kp_value()
            .ok_or_else(|| SourceError::Decode(format!("unreadable Kp value {:?}", latest.kp)))?;
        let time_tag = latest.time_tag.unwrap_or_default();
        let timestamp = parse_utc_millis(&time_tag)
            .ok_or_else(|| SourceError::Decode(format!("unreadable time_tag {time_tag:?}")))?;

        let storm_level = StormLevel::from_kp(kp);
        let visibility = visibility_for(kp);

        let mut event = Event::new(format!("aurora-{time_tag}"), timestamp, Category::Aurora)
            .with_severity(kp_severity(kp))
            .with_title(format!("Aurora Activity: Kp {kp:.1}"));
        event.location = Some(GeoLocation {
            lat: visibility.latitude,
            lon: 0.0,
            name: Some(visibility.region.to_owned()),
        });
        event.description = Some(format!("{} - {}", storm_level.label(), visibility.description));
        event.payload = EventPayload::Aurora(AuroraData {
            kp_index: kp,
            storm_level,
            hemisphere: "both".to_owned(),
        });
        Ok(vec![event])
    }
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

    fn source() -> AuroraSource {
        AuroraSource::new(reqwest::Client::new())
    }

    #[test]
    fn uses_latest_reading() {
        let raw: Vec<KpEntry> = serde_json::from_str(
            r#"[
                {"time_tag": "2024-01-01T11:59:00", "kp": "2M", "kp_index": 2},
                {"time_tag": "2024-01-01T12:00:00", "kp": "6P", "kp_index": 6}
            ]"#,
        )
        .unwrap();
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id.as_str(), "aurora-2024-01-01T12:00:00");
        assert_eq!(event.timestamp, 1_704_110_400_000);
        assert_eq!(event.title.as_deref(), Some("Aurora Activity: Kp 6.0"));
        assert_eq!(
            event.description.as_deref(),
            Some("Moderate Storm - Visible in Iceland, Norway, Alaska")
        );
        assert!(event.is_prominent());
        let EventPayload::Aurora(data) = &event.payload else {
            panic!("expected aurora payload");
        };
        assert_eq!(data.storm_level, StormLevel::ModerateStorm);
        assert_eq!(data.hemisphere, "both");
    }

    #[test]
    fn numeric_kp_is_accepted() {
        let raw: Vec<KpEntry> =
            serde_json::from_str(r#"[{"time_tag": "2024-01-01T12:00:00", "kp": 3.33}]"#).unwrap();
        let events = source().transform(raw).unwrap();
        let location = events[0].location.as_ref().unwrap();
        assert_eq!(location.lat, 67.0);
        assert!(!events[0].is_prominent());
    }

    #[test]
    fn empty_feed_is_valid_and_empty() {
        let raw: Vec<KpEntry> = Vec::new();
        assert!(source().validate(&raw));
        assert!(source().transform(raw).unwrap().is_empty());
    }

    #[test]
    fn entry_without_kp_is_invalid() {
        let raw: Vec<KpEntry> =
            serde_json::from_str(r#"[{"time_tag": "2024-01-01T12:00:00"}]"#).unwrap();
        assert!(!source().validate(&raw));
    }

    #[test]
    fn severity_and_visibility_bands() {
        assert_eq!(kp_severity(9.0), 10.0);
        assert_eq!(kp_severity(0.0), 0.0);
        assert!((kp_severity(4.5) - 5.0).abs() < 1e-9);
        assert_eq!(visibility_for(9.0).latitude, 40.0);
        assert_eq!(visibility_for(7.3).latitude, 50.0);
        assert_eq!(visibility_for(5.0).latitude, 60.0);
    }
}
