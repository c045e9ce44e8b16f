//! Command-line arguments and hub address resolution.

use clap::Parser;

use crate::error::WatchError;

/// Follow a WorldPulse hub from the terminal.
#[derive(Debug, Clone, Parser)]
#[command(name = "worldpulse-watch", version, about)]
pub struct Args {
    /// Hub address: `host:port`, optionally prefixed with `http://`,
    /// `https://`, `ws://`, or `wss://`.
    #[arg(long, env = "WORLDPULSE_HUB", default_value = "localhost:3000")]
    pub hub: String,

    /// Consecutive failed connection attempts before giving up.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: u32,

    /// Delay between connection attempts, in milliseconds.
    #[arg(long = "delay-ms", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Events kept in the local mirror.
    #[arg(long, default_value_t = 100)]
    pub capacity: usize,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Emit JSON log lines.
    #[arg(long)]
    pub json: bool,
}

/// URLs derived from the hub address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEndpoints {
    /// `WebSocket` stream of hub messages.
    pub ws: String,
    /// Adapter status endpoint.
    pub status: String,
}

impl Args {
    /// Resolve the `WebSocket` and status URLs for `--hub`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidHub`] if no host remains after the
    /// scheme is removed.
    pub fn endpoints(&self) -> Result<HubEndpoints, WatchError> {
        let trimmed = self.hub.trim().trim_end_matches('/');
        let (secure, authority) = if let Some(rest) = trimmed.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = trimmed.strip_prefix("wss://") {
            (true, rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            (false, rest)
        } else if let Some(rest) = trimmed.strip_prefix("ws://") {
            (false, rest)
        } else {
            (false, trimmed)
        };

        if authority.is_empty() || authority.contains('/') {
            return Err(WatchError::InvalidHub(self.hub.clone()));
        }

        let (ws_scheme, http_scheme) = if secure { ("wss", "https") } else { ("ws", "http") };
        Ok(HubEndpoints {
            ws: format!("{ws_scheme}://{authority}/ws/events"),
            status: format!("{http_scheme}://{authority}/api/status"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("worldpulse-watch").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["--hub", "localhost:3000"]);
        assert_eq!(args.attempts, 10);
        assert_eq!(args.delay_ms, 1000);
        assert_eq!(args.capacity, 100);
        assert!(!args.json);
    }

    #[test]
    fn overrides() {
        let args = parse(&[
            "--hub",
            "hub.example:8080",
            "--attempts",
            "3",
            "--delay-ms",
            "250",
            "--json",
        ]);
        assert_eq!(args.hub, "hub.example:8080");
        assert_eq!(args.attempts, 3);
        assert_eq!(args.delay_ms, 250);
        assert!(args.json);
    }

    #[test]
    fn zero_attempts_rejected() {
        let result = Args::try_parse_from(["worldpulse-watch", "--attempts", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn bare_address_uses_plain_schemes() {
        let endpoints = parse(&["--hub", "localhost:3000"]).endpoints().unwrap();
        assert_eq!(endpoints.ws, "ws://localhost:3000/ws/events");
        assert_eq!(endpoints.status, "http://localhost:3000/api/status");
    }

    #[test]
    fn https_address_uses_secure_schemes() {
        let endpoints = parse(&["--hub", "https://pulse.example/"]).endpoints().unwrap();
        assert_eq!(endpoints.ws, "wss://pulse.example/ws/events");
        assert_eq!(endpoints.status, "https://pulse.example/api/status");
    }

    #[test]
    fn ws_scheme_is_accepted() {
        let endpoints = parse(&["--hub", "ws://10.0.0.5:3000"]).endpoints().unwrap();
        assert_eq!(endpoints.ws, "ws://10.0.0.5:3000/ws/events");
    }

    #[test]
    fn empty_or_path_address_is_invalid() {
        assert!(parse(&["--hub", "http://"]).endpoints().is_err());
        assert!(parse(&["--hub", "localhost:3000/api"]).endpoints().is_err());
    }
}
