//! USGS earthquake feed.
//!
//! Polls the FDSN event query for the last 24 hours of earthquakes at or
//! above magnitude 2.5.

use std::time::Duration;

use serde::Deserialize;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{Category, EarthquakeData, Event, EventPayload, GeoLocation};

use crate::http::get_json;

const API_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
const MIN_MAGNITUDE: f64 = 2.5;
const LOOKBACK_HOURS: i64 = 24;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration key of this source.
pub const KEY: &str = "earthquakes";

/// GeoJSON `FeatureCollection` returned by the FDSN query.
#[derive(Debug, Clone, Deserialize)]
pub struct UsgsResponse {
    /// Always `FeatureCollection` for a good response.
    #[serde(rename = "type")]
    pub kind: String,
    /// One feature per earthquake.
    #[serde(default)]
    pub features: Vec<UsgsFeature>,
}

/// A single earthquake.
#[derive(Debug, Clone, Deserialize)]
pub struct UsgsFeature {
    /// USGS event id.
    pub id: String,
    /// Event attributes.
    pub properties: UsgsProperties,
    /// Epicenter.
    pub geometry: UsgsGeometry,
}

/// Attributes of an earthquake feature.
#[derive(Debug, Clone, Deserialize)]
pub struct UsgsProperties {
    /// Magnitude; features without one fail validation.
    pub mag: Option<f64>,
    /// Place description.
    #[serde(default)]
    pub place: Option<String>,
    /// Origin time in milliseconds since the Unix epoch.
    pub time: i64,
}

/// Point geometry of an earthquake feature.
#[derive(Debug, Clone, Deserialize)]
pub struct UsgsGeometry {
    /// `[lon, lat, depth_km]`.
    pub coordinates: Vec<f64>,
}

/// Map a magnitude onto the 0-10 severity scale.
///
/// Magnitude 2.5 maps to 0 and magnitude 7 or more to 10.
pub fn magnitude_severity(magnitude: f64) -> f64 {
    ((magnitude - MIN_MAGNITUDE) / 4.5 * 10.0).clamp(0.0, 10.0)
}

/// USGS earthquakes source.
pub struct EarthquakeSource {
    client: reqwest::Client,
}

impl EarthquakeSource {
    /// Create the source over a shared client.
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl EventSource for EarthquakeSource {
    type Raw = UsgsResponse;

    fn name(&self) -> &str {
        "USGS Earthquakes"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Earthquake
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(5 * 60))
    }

    async fn fetch(&self) -> Result<UsgsResponse, SourceError> {
        let now = chrono::Utc::now();
        let start = now
            .checked_sub_signed(chrono::TimeDelta::hours(LOOKBACK_HOURS))
            .unwrap_or(now)
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let min_magnitude = MIN_MAGNITUDE.to_string();
        let query = [
            ("format", "geojson"),
            ("starttime", start.as_str()),
            ("minmagnitude", min_magnitude.as_str()),
            ("orderby", "time"),
        ];
        get_json(&self.client, API_URL, &query, REQUEST_TIMEOUT).await
    }

    fn validate(&self, raw: &UsgsResponse) -> bool {
        raw.kind == "FeatureCollection" && raw.features.iter().all(|f| f.properties.mag.is_some())
    }

    fn transform(&self, raw: UsgsResponse) -> Result<Vec<Event>, SourceError> {
        raw.features.into_iter().map(feature_to_event).collect()
    }
}

fn feature_to_event(feature: UsgsFeature) -> Result<Event, SourceError> {
    let coords = &feature.geometry.coordinates;
    let (Some(&lon), Some(&lat)) = (coords.first(), coords.get(1)) else {
        return Err(SourceError::Invalid(format!(
            "earthquake {} has no coordinates",
            feature.id
        )));
    };
    let depth = coords.get(2).copied().unwrap_or(0.0);
    let magnitude = feature.properties.mag.unwrap_or(0.0);
    let place = feature.properties.place.unwrap_or_default();

    let mut event = Event::new(
        format!("quake-{}", feature.id),
        feature.properties.time,
        Category::Earthquake,
    )
    .with_severity(magnitude_severity(magnitude))
    .with_title(format!("M{magnitude:.1} - {place}"));
    event.location = Some(GeoLocation {
        lat,
        lon,
        name: Some(place.clone()),
    });
    event.description = Some(format!("Depth: {depth:.1} km"));
    event.payload = EventPayload::Earthquake(EarthquakeData {
        magnitude,
        depth,
        region: place,
    });
    Ok(event)
}
