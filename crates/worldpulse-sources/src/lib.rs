//! Concrete event sources for WorldPulse.
//!
//! Each module implements [`EventSource`] for one public API. Sources only
//! know how to fetch, validate, and transform; polling and failure
//! tracking are handled by the adapter in `worldpulse-core`.
//!
//! # Modules
//!
//! - [`earthquakes`] -- USGS FDSN earthquake feed
//! - [`iss`] -- ISS position (wheretheiss.at, open-notify fallback)
//! - [`volcanoes`] -- USGS HANS volcano notices
//! - [`aurora`] -- NOAA planetary K-index
//! - [`asteroids`] -- NASA `NeoWs` close approaches
//! - [`planets`] -- computed planet and moon visibility
//! - [`http`] -- shared client construction and request helpers
//!
//! [`EventSource`]: worldpulse_core::source::EventSource

pub mod asteroids;
pub mod aurora;
pub mod earthquakes;
pub mod http;
pub mod iss;
pub mod planets;
pub mod volcanoes;

pub use asteroids::AsteroidSource;
pub use aurora::AuroraSource;
pub use earthquakes::EarthquakeSource;
pub use http::build_client;
pub use iss::IssSource;
pub use planets::PlanetSource;
pub use volcanoes::VolcanoSource;
