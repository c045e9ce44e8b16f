//! USGS volcano alerts.
//!
//! Reads elevated-status notices from the Hazard Notification System and
//! falls back to the monitored-volcano list, reported at normal status,
//! when the notices endpoint is down.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;
use worldpulse_core::adapter::now_millis;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{AlertLevel, Category, ColorCode, Event, EventPayload, GeoLocation, VolcanoData};

use crate::http::{get_json, parse_utc_millis};

const ELEVATED_URL: &str = "https://volcanoes.usgs.gov/hans-public/api/volcano/getElevatedVolcanoes";
const MONITORED_URL: &str =
    "https://volcanoes.usgs.gov/hans-public/api/volcano/getMonitoredVolcanoes";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MONITORED_LIMIT: usize = 10;

/// Configuration key of this source.
pub const KEY: &str = "volcanoes";

/// `FeatureCollection` of elevated volcano notices.
#[derive(Debug, Clone, Deserialize)]
pub struct ElevatedResponse {
    /// Always `FeatureCollection` for a good response.
    #[serde(rename = "type")]
    pub kind: String,
    /// One feature per notice.
    #[serde(default)]
    pub features: Vec<NoticeFeature>,
}

/// Wrapper around a notice.
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeFeature {
    /// The notice itself.
    pub properties: VolcanoNotice,
}

/// A current alert notice for one volcano.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolcanoNotice {
    /// USGS volcano id.
    pub volcano_id: String,
    /// Volcano name.
    pub volcano_name: String,
    /// Aviation color code, any case.
    pub current_color_code: String,
    /// Ground alert level, any case.
    pub current_alert_level: String,
    /// When the notice was sent (UTC).
    pub sent_utc: String,
    /// Degrees north.
    pub volcano_latitude: f64,
    /// Degrees east.
    pub volcano_longitude: f64,
}

/// A monitored volcano without a current notice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoredVolcano {
    /// Smithsonian volcano number.
    pub vnum: String,
    /// Volcano name.
    pub volcano_name: String,
    /// Country.
    #[serde(default)]
    pub country: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Region.
    #[serde(default)]
    pub region: String,
}

/// Whichever endpoint answered.
#[derive(Debug, Clone)]
pub enum VolcanoFeed {
    /// Elevated notices.
    Elevated(ElevatedResponse),
    /// Monitored list, used when notices are unavailable.
    Monitored(Vec<MonitoredVolcano>),
}

/// Parse an aviation color code; anything unrecognized counts as green.
pub fn parse_color_code(text: &str) -> ColorCode {
    match text.trim().to_ascii_lowercase().as_str() {
        "red" => ColorCode::Red,
        "orange" => ColorCode::Orange,
        "yellow" => ColorCode::Yellow,
        _ => ColorCode::Green,
    }
}

/// Parse a ground alert level; anything unrecognized counts as normal.
pub fn parse_alert_level(text: &str) -> AlertLevel {
    match text.trim().to_ascii_lowercase().as_str() {
        "warning" => AlertLevel::Warning,
        "watch" => AlertLevel::Watch,
        "advisory" => AlertLevel::Advisory,
        _ => AlertLevel::Normal,
    }
}

/// Severity of a color code.
pub const fn color_severity(color: ColorCode) -> f64 {
    match color {
        ColorCode::Red => 10.0,
        ColorCode::Orange => 7.0,
        ColorCode::Yellow => 4.0,
        ColorCode::Green => 1.0,
    }
}

/// USGS volcano source.
pub struct VolcanoSource {
    client: reqwest::Client,
}

impl VolcanoSource {
    /// Create the source over a shared client.
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl EventSource for VolcanoSource {
    type Raw = VolcanoFeed;

    fn name(&self) -> &str {
        "USGS Volcanoes"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Volcano
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(15 * 60))
    }

    async fn fetch(&self) -> Result<VolcanoFeed, SourceError> {
        match get_json(&self.client, ELEVATED_URL, &[], REQUEST_TIMEOUT).await {
            Ok(elevated) => return Ok(VolcanoFeed::Elevated(elevated)),
            Err(e) => warn!(error = %e, "Elevated volcano notices unavailable, trying monitored list"),
        }
        get_json(&self.client, MONITORED_URL, &[], REQUEST_TIMEOUT)
            .await
            .map(VolcanoFeed::Monitored)
    }

    fn validate(&self, raw: &VolcanoFeed) -> bool {
        match raw {
            VolcanoFeed::Elevated(r) => r.kind == "FeatureCollection",
            // Decoding already enforced the element shape.
            VolcanoFeed::Monitored(_) => true,
        }
    }

    fn transform(&self, raw: VolcanoFeed) -> Result<Vec<Event>, SourceError> {
        let events = match raw {
            VolcanoFeed::Elevated(r) => r
                .features
                .into_iter()
                .map(|f| notice_to_event(f.properties))
                .collect(),
            VolcanoFeed::Monitored(list) => {
                let now = now_millis();
                list.into_iter()
                    .take(MONITORED_LIMIT)
                    .map(|v| monitored_to_event(v, now))
                    .collect()
            }
        };
        Ok(events)
    }
}

fn notice_to_event(notice: VolcanoNotice) -> Event {
    let color_text = notice.current_color_code.trim().to_ascii_lowercase();
    let alert_text = notice.current_alert_level.trim().to_ascii_lowercase();
    let color_code = parse_color_code(&color_text);
    let timestamp = parse_utc_millis(&notice.sent_utc).unwrap_or_else(now_millis);

    let mut event = Event::new(
        format!("volcano-{}", notice.volcano_id),
        timestamp,
        Category::Volcano,
    )
    .with_severity(color_severity(color_code))
    .with_title(format!(
        "{} - {}",
        notice.volcano_name,
        alert_text.to_ascii_uppercase()
    ));
    event.location = Some(GeoLocation {
        lat: notice.volcano_latitude,
        lon: notice.volcano_longitude,
        name: Some(notice.volcano_name.clone()),
    });
    event.description = Some(format!("Alert: {alert_text} | Color: {color_text}"));
    event.payload = EventPayload::Volcano(VolcanoData {
        volcano_name: notice.volcano_name,
        alert_level: parse_alert_level(&alert_text),
        color_code,
    });
    event
}

fn monitored_to_event(volcano: MonitoredVolcano, now: i64) -> Event {
    let mut event = Event::new(format!("volcano-{}", volcano.vnum), now, Category::Volcano)
        .with_severity(1.0)
        .with_title(format!("{} - MONITORED", volcano.volcano_name));
    event.location = Some(GeoLocation {
        lat: volcano.latitude,
        lon: volcano.longitude,
        name: Some(volcano.volcano_name.clone()),
    });
    event.description = Some(format!("{}, {}", volcano.region, volcano.country));
    event.payload = EventPayload::Volcano(VolcanoData {
        volcano_name: volcano.volcano_name,
        alert_level: AlertLevel::Normal,
        color_code: ColorCode::Green,
    });
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

    fn source() -> VolcanoSource {
        VolcanoSource::new(reqwest::Client::new())
    }

    const ELEVATED: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"properties": {
                "volcanoId": "ak-pavlof", "volcanoName": "Pavlof",
                "observatoryCode": "AVO",
                "currentColorCode": "ORANGE", "currentAlertLevel": "WATCH",
                "sentUtc": "2024-01-01 12:00:00",
                "volcanoLatitude": 55.42, "volcanoLongitude": -161.89,
                "noticeType": "VAN"
            }},
            {"properties": {
                "volcanoId": "hi-kilauea", "volcanoName": "Kilauea",
                "currentColorCode": "Yellow", "currentAlertLevel": "Advisory",
                "sentUtc": "2024-01-02T00:00:00Z",
                "volcanoLatitude": 19.42, "volcanoLongitude": -155.29
            }}
        ]
    }"#;

    #[test]
    fn transforms_elevated_notices() {
        let raw = VolcanoFeed::Elevated(serde_json::from_str(ELEVATED).unwrap());
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        assert_eq!(events.len(), 2);

        let pavlof = &events[0];
        assert_eq!(pavlof.id.as_str(), "volcano-ak-pavlof");
        assert_eq!(pavlof.timestamp, 1_704_110_400_000);
        assert_eq!(pavlof.severity, Some(7.0));
        assert!(pavlof.is_prominent());
        assert_eq!(pavlof.title.as_deref(), Some("Pavlof - WATCH"));
        assert_eq!(
            pavlof.description.as_deref(),
            Some("Alert: watch | Color: orange")
        );
        let EventPayload::Volcano(data) = &pavlof.payload else {
            panic!("expected volcano payload");
        };
        assert_eq!(data.alert_level, AlertLevel::Watch);
        assert_eq!(data.color_code, ColorCode::Orange);

        assert_eq!(events[1].severity, Some(4.0));
        assert!(!events[1].is_prominent());
    }

    #[test]
    fn wrong_collection_type_is_invalid() {
        let raw = VolcanoFeed::Elevated(
            serde_json::from_str(r#"{"type": "Feature", "features": []}"#).unwrap(),
        );
        assert!(!source().validate(&raw));
    }

    #[test]
    fn monitored_fallback_is_capped_and_normal() {
        let list: Vec<MonitoredVolcano> = (0..15)
            .map(|i| MonitoredVolcano {
                vnum: format!("{i}"),
                volcano_name: format!("Volcano {i}"),
                country: "United States".to_owned(),
                latitude: 50.0,
                longitude: -150.0,
                region: "Alaska".to_owned(),
            })
            .collect();
        let raw = VolcanoFeed::Monitored(list);
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| e.severity == Some(1.0)));
        assert_eq!(events[0].title.as_deref(), Some("Volcano 0 - MONITORED"));
        assert_eq!(
            events[0].description.as_deref(),
            Some("Alaska, United States")
        );
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(parse_color_code("UNASSIGNED"), ColorCode::Green);
        assert_eq!(parse_alert_level(""), AlertLevel::Normal);
        assert_eq!(color_severity(ColorCode::Red), 10.0);
    }
}
