//! NASA NeoWs near-Earth object close approaches.
//!
//! Fetches the feed for the next seven days and keeps the ten closest
//! approaches. Set `NASA_API_KEY` for production use; the shared
//! `DEMO_KEY` is heavily rate limited.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{AsteroidData, Category, Event, EventPayload};

use crate::http::get_json;

const API_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const LOOKAHEAD_DAYS: i64 = 7;
const CLOSEST_LIMIT: usize = 10;
const LUNAR_DISTANCE_KM: f64 = 384_400.0;
const DEMO_KEY: &str = "DEMO_KEY";

/// Configuration key of this source.
pub const KEY: &str = "asteroids";

/// NeoWs feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct NeoFeedResponse {
    /// Total objects in the feed.
    pub element_count: Option<u64>,
    /// Objects keyed by approach date.
    pub near_earth_objects: Option<BTreeMap<String, Vec<NearEarthObject>>>,
}

/// One near-Earth object.
#[derive(Debug, Clone, Deserialize)]
pub struct NearEarthObject {
    /// NeoWs id.
    pub id: String,
    /// Designation, e.g. `(2024 AB1)`.
    pub name: String,
    /// Size estimates.
    pub estimated_diameter: EstimatedDiameter,
    /// NASA potentially-hazardous flag.
    #[serde(default)]
    pub is_potentially_hazardous_asteroid: bool,
    /// Close approaches; the first is the one in the feed window.
    #[serde(default)]
    pub close_approach_data: Vec<CloseApproach>,
}

/// Size estimates in several units.
#[derive(Debug, Clone, Deserialize)]
pub struct EstimatedDiameter {
    /// Estimates in metres.
    pub meters: DiameterRange,
}

/// Minimum and maximum diameter.
#[derive(Debug, Clone, Deserialize)]
pub struct DiameterRange {
    /// Lower bound.
    pub estimated_diameter_min: f64,
    /// Upper bound.
    pub estimated_diameter_max: f64,
}

/// A single close approach.
#[derive(Debug, Clone, Deserialize)]
pub struct CloseApproach {
    /// `YYYY-MM-DD`.
    pub close_approach_date: String,
    /// Milliseconds since the Unix epoch.
    pub epoch_date_close_approach: i64,
    /// Relative velocity.
    pub relative_velocity: RelativeVelocity,
    /// Miss distance.
    pub miss_distance: MissDistance,
}

/// Relative velocity, as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelativeVelocity {
    /// Kilometres per hour.
    pub kilometers_per_hour: String,
}

/// Miss distance, as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct MissDistance {
    /// Kilometres.
    pub kilometers: String,
    /// Lunar distances.
    pub lunar: String,
}

/// Score an approach by distance, size, and the hazardous flag, capped at 10.
pub fn approach_severity(distance_km: f64, diameter_m: f64, hazardous: bool) -> f64 {
    let lunar_distances = distance_km / LUNAR_DISTANCE_KM;
    let distance_score = if lunar_distances < 1.0 {
        5.0
    } else if lunar_distances < 5.0 {
        3.0
    } else if lunar_distances < 10.0 {
        1.0
    } else {
        0.0
    };
    let size_score = if diameter_m > 1000.0 {
        3.0
    } else if diameter_m > 500.0 {
        2.0
    } else if diameter_m > 100.0 {
        1.0
    } else {
        0.0
    };
    let hazard_score = if hazardous { 2.0 } else { 0.0 };
    f64::min(10.0, distance_score + size_score + hazard_score)
}

/// NASA asteroid source.
pub struct AsteroidSource {
    client: reqwest::Client,
    api_key: String,
}

impl AsteroidSource {
    /// Create the source with an explicit API key.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Create the source with the key from `NASA_API_KEY`, or `DEMO_KEY`.
    pub fn from_env(client: reqwest::Client) -> Self {
        let api_key = std::env::var("NASA_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEMO_KEY.to_owned());
        Self::new(client, api_key)
    }
}

impl EventSource for AsteroidSource {
    type Raw = NeoFeedResponse;

    fn name(&self) -> &str {
        "Near-Earth Asteroids"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Asteroid
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(30 * 60))
    }

    async fn fetch(&self) -> Result<NeoFeedResponse, SourceError> {
        let today = chrono::Utc::now().date_naive();
        let end = today
            .checked_add_signed(chrono::TimeDelta::days(LOOKAHEAD_DAYS))
            .unwrap_or(today);
        let start_date = today.format("%Y-%m-%d").to_string();
        let end_date = end.format("%Y-%m-%d").to_string();
        let query = [
            ("start_date", start_date.as_str()),
            ("end_date", end_date.as_str()),
            ("api_key", self.api_key.as_str()),
        ];
        get_json(&self.client, API_URL, &query, REQUEST_TIMEOUT).await
    }

    fn validate(&self, raw: &NeoFeedResponse) -> bool {
        raw.element_count.is_some() && raw.near_earth_objects.is_some()
    }

    fn transform(&self, raw: NeoFeedResponse) -> Result<Vec<Event>, SourceError> {
        let mut approaches: Vec<(f64, Event)> = Vec::new();
        for neo in raw.near_earth_objects.into_iter().flat_map(BTreeMap::into_values).flatten() {
            if let Some(approach) = neo.close_approach_data.first() {
                approaches.push(approach_to_event(&neo, approach)?);
            }
        }
        approaches.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(approaches
            .into_iter()
            .take(CLOSEST_LIMIT)
            .map(|(_, event)| event)
            .collect())
    }
}

fn parse_decimal(text: &str, field: &str) -> Result<f64, SourceError> {
    text.trim()
        .parse()
        .map_err(|e| SourceError::Decode(format!("bad {field} {text:?}: {e}")))
}

fn approach_to_event(
    neo: &NearEarthObject,
    approach: &CloseApproach,
) -> Result<(f64, Event), SourceError> {
    let miss_km = parse_decimal(&approach.miss_distance.kilometers, "miss distance")?;
    let miss_lunar = parse_decimal(&approach.miss_distance.lunar, "lunar distance")?;
    let velocity = parse_decimal(&approach.relative_velocity.kilometers_per_hour, "velocity")?;
    let diameter_min = neo.estimated_diameter.meters.estimated_diameter_min;
    let diameter_max = neo.estimated_diameter.meters.estimated_diameter_max;
    let hazardous = neo.is_potentially_hazardous_asteroid;
    let name: String = neo.name.chars().filter(|c| !matches!(c, '(' | ')')).collect();
    let name = name.trim().to_owned();

    let mut event = Event::new(
        format!("asteroid-{}", neo.id),
        approach.epoch_date_close_approach,
        Category::Asteroid,
    )
    .with_severity(approach_severity(miss_km, diameter_max, hazardous))
    .with_title(format!("Asteroid {name}"));
    event.description = Some(format!(
        "{miss_lunar:.1} lunar distances | {diameter_max:.0}m diameter"
    ));
    event.payload = EventPayload::Asteroid(AsteroidData {
        name,
        diameter_min,
        diameter_max,
        velocity,
        miss_distance: miss_km,
        hazardous,
        approach_date: approach.close_approach_date.clone(),
    });
    Ok((miss_km, event))
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

    fn source() -> AsteroidSource {
        AsteroidSource::new(reqwest::Client::new(), "TEST_KEY")
    }

    fn neo_json(id: &str, miss_km: &str, diameter_max: f64, hazardous: bool) -> String {
        format!(
            r#"{{
                "id": "{id}",
                "name": "({id} AB)",
                "estimated_diameter": {{"meters": {{
                    "estimated_diameter_min": 10.0,
                    "estimated_diameter_max": {diameter_max}
                }}}},
                "is_potentially_hazardous_asteroid": {hazardous},
                "close_approach_data": [{{
                    "close_approach_date": "2024-01-03",
                    "epoch_date_close_approach": 1704240000000,
                    "relative_velocity": {{"kilometers_per_hour": "45000.5"}},
                    "miss_distance": {{"kilometers": "{miss_km}", "lunar": "1.5"}}
                }}]
            }}"#
        )
    }

    #[test]
    fn keeps_closest_ten_sorted_by_distance() {
        let day_one: Vec<String> = (0..8)
            .map(|i| neo_json(&format!("a{i}"), &format!("{}", 9_000_000 - i * 100_000), 50.0, false))
            .collect();
        let day_two: Vec<String> = (0..6)
            .map(|i| neo_json(&format!("b{i}"), &format!("{}", 1_000_000 + i * 100_000), 50.0, false))
            .collect();
        let text = format!(
            r#"{{"element_count": 14, "near_earth_objects": {{
                "2024-01-03": [{}],
                "2024-01-04": [{}]
            }}}}"#,
            day_one.join(","),
            day_two.join(",")
        );
        let raw: NeoFeedResponse = serde_json::from_str(&text).unwrap();
        assert!(source().validate(&raw));

        let events = source().transform(raw).unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[0].id.as_str(), "asteroid-b0");
        let distances: Vec<f64> = events
            .iter()
            .map(|e| match &e.payload {
                EventPayload::Asteroid(data) => data.miss_distance,
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn transforms_fields() {
        let text = format!(
            r#"{{"element_count": 1, "near_earth_objects": {{"2024-01-03": [{}]}}}}"#,
            neo_json("2024", "200000", 750.4, true)
        );
        let raw: NeoFeedResponse = serde_json::from_str(&text).unwrap();
        let events = source().transform(raw).unwrap();
        let event = &events[0];

        assert_eq!(event.id.as_str(), "asteroid-2024");
        assert_eq!(event.timestamp, 1_704_240_000_000);
        assert!(event.location.is_none());
        assert_eq!(event.title.as_deref(), Some("Asteroid 2024 AB"));
        assert_eq!(
            event.description.as_deref(),
            Some("1.5 lunar distances | 750m diameter")
        );
        // Inside one lunar distance (5), over 500 m (2), hazardous (2).
        assert_eq!(event.severity, Some(9.0));
        let EventPayload::Asteroid(data) = &event.payload else {
            panic!("expected asteroid payload");
        };
        assert_eq!(data.approach_date, "2024-01-03");
        assert_eq!(data.velocity, 45_000.5);
        assert!(data.hazardous);
    }

    #[test]
    fn missing_fields_are_invalid() {
        let raw: NeoFeedResponse = serde_json::from_str(r#"{"links": {}}"#).unwrap();
        assert!(!source().validate(&raw));
    }

    #[test]
    fn severity_is_capped() {
        assert_eq!(approach_severity(100_000.0, 5000.0, true), 10.0);
        assert_eq!(approach_severity(10_000_000.0, 20.0, false), 0.0);
        assert_eq!(approach_severity(1_000_000.0, 200.0, false), 4.0);
    }
}
