//! Shared type definitions for WorldPulse.
//!
//! This crate is the single source of truth for the event schema and the
//! messages exchanged between the hub and its observers. Types defined
//! here flow downstream to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- the [`EventId`] wrapper
//! - [`enums`] -- event categories and payload enumerations
//! - [`structs`] -- [`Event`], [`GeoLocation`], and source payloads
//! - [`messages`] -- hub wire messages and adapter status records

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AlertLevel, Category, ColorCode, DisabledReason, StormLevel};
pub use ids::EventId;
pub use messages::{DisabledNotice, EventsPayload, HubMessage, StatusRecord};
pub use structs::{
    AsteroidData, AuroraData, EarthquakeData, Event, EventPayload, FEATURED_SEVERITY_THRESHOLD,
    GeoLocation, IssData, PlanetData, VolcanoData,
};
