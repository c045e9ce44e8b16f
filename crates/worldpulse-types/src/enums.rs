//! Enumeration types shared by sources, the hub, and observers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event categories
// ---------------------------------------------------------------------------

/// The kind of real-world phenomenon an event describes.
///
/// Serialized lowercase (`"earthquake"`, `"iss"`, ...) under the JSON key
/// `type` of an [`Event`](crate::Event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Category {
    /// Seismic activity.
    Earthquake,
    /// Volcanic alert or monitoring notice.
    Volcano,
    /// Position of the International Space Station.
    Iss,
    /// Geomagnetic activity and aurora visibility.
    Aurora,
    /// Near-Earth object close approach.
    Asteroid,
    /// Naked-eye planet visibility.
    Planet,
    /// Weather observation.
    Weather,
    /// News headline.
    News,
    /// Other astronomical phenomena.
    Astronomy,
    /// Ocean conditions.
    Ocean,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Earthquake,
        Self::Volcano,
        Self::Iss,
        Self::Aurora,
        Self::Asteroid,
        Self::Planet,
        Self::Weather,
        Self::News,
        Self::Astronomy,
        Self::Ocean,
    ];

    /// Look up a category by its lowercase wire name.
    ///
    /// Returns `None` for names that are not exactly a wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// The lowercase wire name of this category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Earthquake => "earthquake",
            Self::Volcano => "volcano",
            Self::Iss => "iss",
            Self::Aurora => "aurora",
            Self::Asteroid => "asteroid",
            Self::Planet => "planet",
            Self::Weather => "weather",
            Self::News => "news",
            Self::Astronomy => "astronomy",
            Self::Ocean => "ocean",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Source payload enums
// ---------------------------------------------------------------------------

/// USGS volcano aviation color code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ColorCode {
    /// Background, non-eruptive state.
    Green,
    /// Elevated unrest above background.
    Yellow,
    /// Heightened unrest with increased likelihood of eruption.
    Orange,
    /// Eruption imminent or underway.
    Red,
}

/// USGS volcano ground-based alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AlertLevel {
    /// Typical background activity.
    Normal,
    /// Elevated unrest.
    Advisory,
    /// Escalating unrest or minor eruption.
    Watch,
    /// Hazardous eruption imminent or underway.
    Warning,
}

/// Geomagnetic storm classification derived from the planetary K-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StormLevel {
    /// Kp below 4.
    Quiet,
    /// Kp 4.
    Unsettled,
    /// Kp 5 (G1).
    MinorStorm,
    /// Kp 6 (G2).
    ModerateStorm,
    /// Kp 7 (G3).
    StrongStorm,
    /// Kp 8 and above (G4/G5).
    SevereStorm,
}

impl StormLevel {
    /// Classify a planetary K-index reading.
    pub fn from_kp(kp: f64) -> Self {
        if kp >= 8.0 {
            Self::SevereStorm
        } else if kp >= 7.0 {
            Self::StrongStorm
        } else if kp >= 6.0 {
            Self::ModerateStorm
        } else if kp >= 5.0 {
            Self::MinorStorm
        } else if kp >= 4.0 {
            Self::Unsettled
        } else {
            Self::Quiet
        }
    }

    /// Human-readable label, e.g. `Minor Storm`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quiet => "Quiet",
            Self::Unsettled => "Unsettled",
            Self::MinorStorm => "Minor Storm",
            Self::ModerateStorm => "Moderate Storm",
            Self::StrongStorm => "Strong Storm",
            Self::SevereStorm => "Severe Storm",
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter lifecycle
// ---------------------------------------------------------------------------

/// Why a source adapter was permanently disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DisabledReason {
    /// The consecutive-failure threshold was reached.
    MaxErrors,
}

impl DisabledReason {
    /// The wire name of this reason (`max_errors`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxErrors => "max_errors",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_names_are_lowercase() {
        let json = serde_json::to_string(&Category::Earthquake).ok();
        assert_eq!(json.as_deref(), Some("\"earthquake\""));
        let parsed: Option<Category> = serde_json::from_str("\"iss\"").ok();
        assert_eq!(parsed, Some(Category::Iss));
        assert_eq!(Category::Asteroid.to_string(), "asteroid");
    }

    #[test]
    fn category_from_wire_matches_serde_names() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(format!("\"{}\"", category.as_str()), json);
            assert_eq!(Category::from_wire(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_wire("meteor"), None);
        assert_eq!(Category::from_wire("Earthquake"), None);
        assert_eq!(Category::from_wire(""), None);
    }

    #[test]
    fn storm_level_thresholds() {
        assert_eq!(StormLevel::from_kp(2.33), StormLevel::Quiet);
        assert_eq!(StormLevel::from_kp(4.0), StormLevel::Unsettled);
        assert_eq!(StormLevel::from_kp(5.67), StormLevel::MinorStorm);
        assert_eq!(StormLevel::from_kp(6.0), StormLevel::ModerateStorm);
        assert_eq!(StormLevel::from_kp(7.33), StormLevel::StrongStorm);
        assert_eq!(StormLevel::from_kp(9.0), StormLevel::SevereStorm);
    }

    #[test]
    fn storm_level_serializes_snake_case() {
        let json = serde_json::to_string(&StormLevel::MinorStorm).ok();
        assert_eq!(json.as_deref(), Some("\"minor_storm\""));
    }

    #[test]
    fn disabled_reason_wire_name() {
        let json = serde_json::to_string(&DisabledReason::MaxErrors).ok();
        assert_eq!(json.as_deref(), Some("\"max_errors\""));
        assert_eq!(DisabledReason::MaxErrors.as_str(), "max_errors");
    }
}
