//! The capability every external event source provides.
//!
//! A source knows how to fetch one raw response, check its shape, and
//! turn it into normalized [`Event`]s. Scheduling, failure counting, and
//! delivery live in [`Adapter`](crate::adapter::Adapter); a source holds no
//! mutable polling state of its own.

use std::future::Future;
use std::time::Duration;

use worldpulse_types::{Category, Event};

/// Errors a source can report for a single poll.
///
/// The adapter treats every variant the same way: one failure towards the
/// circuit breaker.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be sent or the body could not be read.
    #[error("http error: {0}")]
    Http(String),

    /// The upstream answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response parsed but failed shape validation.
    #[error("invalid response: {0}")]
    Invalid(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Polling cadence and failure tolerance for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSettings {
    /// Time between polls.
    pub interval: Duration,
    /// Consecutive failures that permanently disable the adapter.
    pub max_errors: u32,
}

impl AdapterSettings {
    /// Settings with the given interval and the default threshold.
    pub const fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// Consecutive failures tolerated when a source does not say otherwise.
pub const DEFAULT_MAX_ERRORS: u32 = 5;

impl Default for AdapterSettings {
    fn default() -> Self {
        Self::every(Duration::from_secs(60))
    }
}

/// An external data source polled by an [`Adapter`](crate::adapter::Adapter).
pub trait EventSource: Send + Sync + 'static {
    /// The raw response type returned by [`fetch`](Self::fetch).
    type Raw: Send;

    /// Display name, also used as the adapter name.
    fn name(&self) -> &str;

    /// Short key used for configuration lookup (e.g. `earthquakes`).
    fn key(&self) -> &str;

    /// Category of the events this source produces.
    fn category(&self) -> Category;

    /// Interval and threshold used when configuration does not override them.
    fn default_settings(&self) -> AdapterSettings {
        AdapterSettings::default()
    }

    /// Fetch one raw response. This is the only suspension point of a poll.
    fn fetch(&self) -> impl Future<Output = Result<Self::Raw, SourceError>> + Send;

    /// Shape check over the raw response.
    fn validate(&self, raw: &Self::Raw) -> bool;

    /// Convert a validated response into events.
    ///
    /// Ids must be unique within the returned batch.
    fn transform(&self, raw: Self::Raw) -> Result<Vec<Event>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = AdapterSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.max_errors, 5);
    }

    #[test]
    fn status_error_message() {
        let err = SourceError::Status {
            status: 503,
            url: String::from("https://example.test/feed"),
        };
        assert_eq!(
            err.to_string(),
            "https://example.test/feed returned HTTP 503"
        );
    }
}
