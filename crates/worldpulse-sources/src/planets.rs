//! Naked-eye planet and moon visibility.
//!
//! No upstream API: positions come from mean orbital longitudes since
//! J2000, which is good to a constellation or so. The altitude model
//! assumes a mid-northern observer and uses the UTC hour as local time.

use std::f64::consts::TAU;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use worldpulse_core::source::{AdapterSettings, EventSource, SourceError};
use worldpulse_types::{Category, Event, EventPayload, PlanetData};

/// Configuration key of this source.
pub const KEY: &str = "planets";

/// Mean lunar synodic month in days.
const LUNAR_CYCLE_DAYS: f64 = 29.53;

/// Obliquity of the ecliptic used by the altitude model, in degrees.
const OBLIQUITY_DEG: f64 = 23.5;

/// Bodies below this altitude are not reported.
const MIN_ALTITUDE_DEG: f64 = -10.0;

/// Mean elements of a naked-eye planet.
struct Planet {
    name: &'static str,
    symbol: &'static str,
    /// Mean longitude at J2000, degrees.
    mean_longitude: f64,
    /// Sidereal period, days.
    period: f64,
    /// Typical apparent magnitude.
    magnitude: f64,
}

const PLANETS: [Planet; 5] = [
    Planet {
        name: "Mercury",
        symbol: "☿",
        mean_longitude: 252.25,
        period: 87.97,
        magnitude: -0.4,
    },
    Planet {
        name: "Venus",
        symbol: "♀",
        mean_longitude: 181.98,
        period: 224.7,
        magnitude: -4.4,
    },
    Planet {
        name: "Mars",
        symbol: "♂",
        mean_longitude: 355.45,
        period: 686.98,
        magnitude: -2.0,
    },
    Planet {
        name: "Jupiter",
        symbol: "♃",
        mean_longitude: 34.33,
        period: 4332.59,
        magnitude: -2.7,
    },
    Planet {
        name: "Saturn",
        symbol: "♄",
        mean_longitude: 50.08,
        period: 10759.22,
        magnitude: 0.5,
    },
];

/// Zodiac constellations by starting ecliptic longitude, 30 degrees each.
const CONSTELLATIONS: [(f64, &str); 12] = [
    (0.0, "Aries"),
    (30.0, "Taurus"),
    (60.0, "Gemini"),
    (90.0, "Cancer"),
    (120.0, "Leo"),
    (150.0, "Virgo"),
    (180.0, "Libra"),
    (210.0, "Scorpius"),
    (240.0, "Sagittarius"),
    (270.0, "Capricornus"),
    (300.0, "Aquarius"),
    (330.0, "Pisces"),
];

/// Constellation containing an ecliptic longitude.
pub fn constellation_for(longitude: f64) -> &'static str {
    let lon = longitude.rem_euclid(360.0);
    CONSTELLATIONS
        .iter()
        .rev()
        .find(|(start, _)| lon >= *start)
        .map_or("Aries", |&(_, name)| name)
}

/// Map apparent magnitude onto the 0-10 severity scale; brighter is higher.
pub const fn magnitude_severity(magnitude: f64) -> f64 {
    if magnitude < -3.0 {
        8.0
    } else if magnitude < -1.0 {
        6.0
    } else if magnitude < 1.0 {
        4.0
    } else {
        2.0
    }
}

/// Observing advice for a body at `altitude` degrees.
pub const fn visibility_text(altitude: f64, magnitude: f64) -> &'static str {
    if altitude > 30.0 {
        if magnitude < 0.0 { "Excellent visibility - bright!" } else { "Good visibility" }
    } else if altitude > 10.0 {
        "Visible in evening/morning sky"
    } else if altitude > 0.0 {
        "Low on horizon - look early/late"
    } else {
        "Below horizon - not currently visible"
    }
}

/// Name of a lunar phase in `[0, 1)`, 0 being new moon.
pub fn moon_phase_name(phase: f64) -> &'static str {
    if !(0.03..=0.97).contains(&phase) {
        "New Moon"
    } else if phase < 0.22 {
        "Waxing Crescent"
    } else if phase < 0.28 {
        "First Quarter"
    } else if phase < 0.47 {
        "Waxing Gibbous"
    } else if phase < 0.53 {
        "Full Moon"
    } else if phase < 0.72 {
        "Waning Gibbous"
    } else if phase < 0.78 {
        "Last Quarter"
    } else {
        "Waning Crescent"
    }
}

/// Days elapsed from `epoch` to `now`; negative before the epoch.
fn days_since(now: DateTime<Utc>, epoch: DateTime<Utc>) -> f64 {
    now.signed_duration_since(epoch).as_seconds_f64() / 86_400.0
}

fn j2000() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).single().unwrap_or_default()
}

fn reference_new_moon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 11, 11, 57, 0).single().unwrap_or_default()
}

fn estimate_altitude(longitude: f64, hour_angle: f64) -> f64 {
    let obliquity = OBLIQUITY_DEG.to_radians();
    let lon = longitude.to_radians();
    let sin_alt = (obliquity.cos() * lon.cos())
        .mul_add(hour_angle.to_radians().cos(), obliquity.sin() * lon.sin());
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// `~HH:00` for the hour a body at `longitude` crosses `base_hour`.
fn crossing_time(longitude: f64, base_hour: f64) -> String {
    let hour = (base_hour + ((360.0 - longitude) / 360.0 * 24.0).floor()).rem_euclid(24.0);
    format!("~{hour:02.0}:00")
}

fn planet_event(planet: &Planet, now: DateTime<Utc>) -> Option<Event> {
    let longitude = (360.0 / planet.period)
        .mul_add(days_since(now, j2000()), planet.mean_longitude)
        .rem_euclid(360.0);
    let hour_angle = (f64::from(now.hour()) - 12.0) * 15.0;
    let altitude = estimate_altitude(longitude, hour_angle);
    if altitude < MIN_ALTITUDE_DEG {
        return None;
    }

    let constellation = constellation_for(longitude);
    let mut event = Event::new(
        format!("planet-{}", planet.name.to_lowercase()),
        now.timestamp_millis(),
        Category::Planet,
    )
    .with_severity(magnitude_severity(planet.magnitude))
    .with_title(format!("{} {} in {constellation}", planet.symbol, planet.name));
    event.description = Some(visibility_text(altitude, planet.magnitude).to_owned());
    event.payload = EventPayload::Planet(PlanetData {
        planet_name: planet.name.to_owned(),
        constellation: constellation.to_owned(),
        magnitude: planet.magnitude,
        altitude,
        azimuth: (longitude + hour_angle + 180.0).rem_euclid(360.0),
        rise_time: crossing_time(longitude, 6.0),
        set_time: crossing_time(longitude, 18.0),
        phase: None,
    });
    Some(event)
}

fn moon_event(now: DateTime<Utc>) -> Event {
    let phase =
        days_since(now, reference_new_moon()).rem_euclid(LUNAR_CYCLE_DAYS) / LUNAR_CYCLE_DAYS;
    let illuminated = (1.0 - (phase * TAU).cos()) / 2.0;
    let constellation = constellation_for(phase * 360.0);

    let mut event = Event::new("planet-moon", now.timestamp_millis(), Category::Planet)
        .with_severity(2.0)
        .with_title(format!("🌙 Moon - {}", moon_phase_name(phase)));
    event.description = Some(format!("{:.0}% illuminated in {constellation}", illuminated * 100.0));
    event.payload = EventPayload::Planet(PlanetData {
        planet_name: "Moon".to_owned(),
        constellation: constellation.to_owned(),
        magnitude: (1.0 - illuminated).mul_add(10.0, -12.7),
        altitude: 45.0,
        azimuth: 180.0,
        rise_time: "Varies".to_owned(),
        set_time: "Varies".to_owned(),
        phase: Some(phase),
    });
    event
}

/// The moon followed by every planet above the reporting altitude at `now`.
pub fn sky_at(now: DateTime<Utc>) -> Vec<Event> {
    std::iter::once(moon_event(now))
        .chain(PLANETS.iter().filter_map(|planet| planet_event(planet, now)))
        .collect()
}

/// Computed planet visibility source.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanetSource;

impl PlanetSource {
    /// Create the source.
    pub const fn new() -> Self {
        Self
    }
}

impl EventSource for PlanetSource {
    type Raw = DateTime<Utc>;

    fn name(&self) -> &str {
        "Planet Visibility"
    }

    fn key(&self) -> &str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Planet
    }

    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::every(Duration::from_secs(60 * 60))
    }

    async fn fetch(&self) -> Result<DateTime<Utc>, SourceError> {
        Ok(Utc::now())
    }

    fn validate(&self, _raw: &DateTime<Utc>) -> bool {
        true
    }

    fn transform(&self, raw: DateTime<Utc>) -> Result<Vec<Event>, SourceError> {
        Ok(sky_at(raw))
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

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    fn planet_data(event: &Event) -> &PlanetData {
        let EventPayload::Planet(data) = &event.payload else {
            panic!("expected planet payload for {}", event.id.as_str());
        };
        data
    }

    #[test]
    fn moon_comes_first_and_ids_are_prefixed() {
        let now = at(2024, 6, 1, 21, 30);
        let events = PlanetSource::new().transform(now).unwrap();
        assert!(!events.is_empty());
        assert_eq!(events[0].id.as_str(), "planet-moon");
        for event in &events {
            assert!(event.id.as_str().starts_with("planet-"));
            assert_eq!(event.category, Category::Planet);
            assert_eq!(event.timestamp, now.timestamp_millis());
            assert!(event.location.is_none());
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let now = at(2025, 3, 14, 3, 0);
        assert_eq!(sky_at(now), sky_at(now));
        assert!(PlanetSource::new().validate(&now));
    }

    #[test]
    fn new_moon_at_reference_epoch() {
        let moon = moon_event(at(2024, 1, 11, 11, 57));
        assert_eq!(moon.title.as_deref(), Some("🌙 Moon - New Moon"));
        assert_eq!(moon.description.as_deref(), Some("0% illuminated in Aries"));
        assert_eq!(moon.severity, Some(2.0));
        let data = planet_data(&moon);
        assert_eq!(data.phase, Some(0.0));
        assert!((data.magnitude - -2.7).abs() < 1e-9);
        assert_eq!(data.rise_time, "Varies");
    }

    #[test]
    fn full_moon_half_a_cycle_later() {
        // 14.79 days after the reference new moon.
        let moon = moon_event(at(2024, 1, 26, 7, 0));
        assert_eq!(moon.title.as_deref(), Some("🌙 Moon - Full Moon"));
        assert_eq!(moon.description.as_deref(), Some("100% illuminated in Libra"));
        let data = planet_data(&moon);
        assert!((data.magnitude - -12.7).abs() < 0.01);
    }

    #[test]
    fn planet_events_follow_magnitude_table() {
        for hour in 0..24 {
            for event in sky_at(at(2024, 6, 1, hour, 0)).iter().skip(1) {
                let data = planet_data(event);
                assert_eq!(event.severity, Some(magnitude_severity(data.magnitude)));
                assert!(data.altitude >= MIN_ALTITUDE_DEG);
                assert!((0.0..360.0).contains(&data.azimuth));
                assert!(data.rise_time.starts_with('~') && data.rise_time.ends_with(":00"));
                assert_eq!(data.rise_time.len(), 6);
                assert!(data.phase.is_none());
                let title = event.title.as_deref().unwrap();
                assert!(title.contains(&format!("{} in {}", data.planet_name, data.constellation)));
            }
        }
        assert_eq!(magnitude_severity(-4.4), 8.0);
        assert_eq!(magnitude_severity(-2.0), 6.0);
        assert_eq!(magnitude_severity(-0.4), 4.0);
        assert_eq!(magnitude_severity(1.5), 2.0);
    }

    #[test]
    fn constellation_bands_wrap() {
        assert_eq!(constellation_for(0.0), "Aries");
        assert_eq!(constellation_for(29.9), "Aries");
        assert_eq!(constellation_for(30.0), "Taurus");
        assert_eq!(constellation_for(359.0), "Pisces");
        assert_eq!(constellation_for(-15.0), "Pisces");
        assert_eq!(constellation_for(725.0), "Aries");
    }

    #[test]
    fn visibility_and_phase_bands() {
        assert_eq!(visibility_text(45.0, -4.4), "Excellent visibility - bright!");
        assert_eq!(visibility_text(45.0, 0.5), "Good visibility");
        assert_eq!(visibility_text(20.0, 0.5), "Visible in evening/morning sky");
        assert_eq!(visibility_text(5.0, 0.5), "Low on horizon - look early/late");
        assert_eq!(visibility_text(-5.0, 0.5), "Below horizon - not currently visible");
        assert_eq!(moon_phase_name(0.98), "New Moon");
        assert_eq!(moon_phase_name(0.25), "First Quarter");
        assert_eq!(moon_phase_name(0.75), "Last Quarter");
        assert_eq!(moon_phase_name(0.9), "Waning Crescent");
    }

    #[test]
    fn crossing_time_is_zero_padded() {
        assert_eq!(crossing_time(0.0, 6.0), "~06:00");
        assert_eq!(crossing_time(180.0, 18.0), "~06:00");
        assert_eq!(crossing_time(350.0, 6.0), "~06:00");
        assert_eq!(crossing_time(90.0, 18.0), "~12:00");
    }
}
