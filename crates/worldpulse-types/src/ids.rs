//! Identifier wrapper for normalized events.
//!
//! Event ids are strings chosen by the source adapter. Continuously
//! updated phenomena (the ISS position) reuse one id across polls so a
//! new fetch replaces the old reading; discrete phenomena (an earthquake)
//! get an id that is unique per occurrence, usually prefixed with the
//! source kind (`quake-us7000abcd`).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Identity of an [`Event`](crate::Event) within a cache or observer store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventId(pub String);

impl EventId {
    /// Create an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
