//! Shared HTTP plumbing for the concrete sources.

use std::time::Duration;

use serde::de::DeserializeOwned;
use worldpulse_core::source::SourceError;

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!("worldpulse/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by all sources.
///
/// Per-request timeouts are set by each source; this only bounds the
/// connection phase.
pub fn build_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}

/// GET `url` with `query` and decode the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .query(query)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| SourceError::Http(format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Decode(format!("{url}: {e}")))
}

/// Parse an upstream timestamp into milliseconds since the Unix epoch.
///
/// Accepts RFC 3339 and the zone-less `YYYY-MM-DD[T ]HH:MM:SS` forms that
/// USGS and NOAA emit, which are UTC.
pub(crate) fn parse_utc_millis(text: &str) -> Option<i64> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Parse the leading decimal number of `text`, ignoring any suffix.
///
/// NOAA reports values such as `"2M"` or `"4+"`.
pub(crate) fn leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed.get(..end)?.parse().ok()
}
