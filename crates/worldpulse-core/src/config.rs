//! Configuration loading and typed config structures for WorldPulse.
//!
//! The canonical configuration lives in `worldpulse.yaml` next to the
//! engine binary. Every section and field has a default, so an empty file
//! (or no file at all) yields a working setup.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 3000
//!   cors_origin: http://localhost:5173
//! cache:
//!   capacity: 100
//! logging:
//!   level: info
//!   json: false
//! sources:
//!   earthquakes: { enabled: true, interval_ms: 300000, max_errors: 5 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::source::AdapterSettings;
use crate::window::DEFAULT_CAPACITY;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorldPulseConfig {
    /// HTTP/WebSocket listener settings.
    #[serde(default)]
    pub server: HubConfig,

    /// Shared event cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-source overrides keyed by source key (e.g. `earthquakes`).
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl WorldPulseConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// - `PORT` overrides `server.port`
    /// - `WORLDPULSE_CORS_ORIGIN` overrides `server.cors_origin`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// Environment overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be > 0".to_owned()));
        }
        for (key, source) in &self.sources {
            if source.interval_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "sources.{key}.interval_ms must be > 0"
                )));
            }
            if source.max_errors == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "sources.{key}.max_errors must be > 0"
                )));
            }
        }
        Ok(())
    }

    /// Whether the source with the given key should be started.
    ///
    /// Sources without an entry are enabled.
    pub fn source_enabled(&self, key: &str) -> bool {
        self.sources.get(key).is_none_or(|s| s.enabled)
    }

    /// Resolve the adapter settings for a source, layering any configured
    /// override on top of the source's own defaults.
    pub fn adapter_settings(&self, key: &str, defaults: AdapterSettings) -> AdapterSettings {
        let Some(source) = self.sources.get(key) else {
            return defaults;
        };
        AdapterSettings {
            interval: source
                .interval_ms
                .map_or(defaults.interval, Duration::from_millis),
            max_errors: source.max_errors.unwrap_or(defaults.max_errors),
        }
    }
}

/// Listener settings for the distribution hub.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin for the dashboard, `*` for any.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl HubConfig {
    /// Override listener settings with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("PORT") {
            self.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("invalid PORT {val:?}: {e}")))?;
        }
        if let Ok(val) = std::env::var("WORLDPULSE_CORS_ORIGIN") {
            self.cors_origin = val;
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Shared event cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of events retained.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Per-source override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Whether the source is started at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Polling interval in milliseconds; the source default when absent.
    #[serde(default)]
    pub interval_ms: Option<u64>,

    /// Consecutive failures before the adapter disables itself.
    #[serde(default)]
    pub max_errors: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: None,
            max_errors: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_owned()
}

const fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WorldPulseConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.logging.level, "info");
        assert!(config.sources.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = WorldPulseConfig::parse("").unwrap();
        assert_eq!(config, WorldPulseConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
server:
  host: 127.0.0.1
  port: 8080
  cors_origin: '*'
cache:
  capacity: 50
logging:
  level: debug
  json: true
sources:
  earthquakes:
    interval_ms: 60000
    max_errors: 3
  iss:
    enabled: false
";
        let config = WorldPulseConfig::parse(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origin, "*");
        assert_eq!(config.cache.capacity, 50);
        assert!(config.logging.json);
        assert!(config.source_enabled("earthquakes"));
        assert!(!config.source_enabled("iss"));
        assert!(config.source_enabled("aurora"));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = WorldPulseConfig::parse("server:\n  port: 4000\n").unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cache.capacity, 100);
    }

    #[test]
    fn adapter_settings_layer_over_defaults() {
        let yaml = "sources:\n  earthquakes:\n    max_errors: 2\n";
        let config = WorldPulseConfig::parse(yaml).unwrap();
        let defaults = AdapterSettings {
            interval: Duration::from_secs(300),
            max_errors: 5,
        };

        let resolved = config.adapter_settings("earthquakes", defaults);
        assert_eq!(resolved.interval, Duration::from_secs(300));
        assert_eq!(resolved.max_errors, 2);

        let untouched = config.adapter_settings("aurora", defaults);
        assert_eq!(untouched, defaults);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = WorldPulseConfig::parse("cache:\n  capacity: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = WorldPulseConfig::parse("sources:\n  iss:\n    interval_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("sources.iss.interval_ms"));

        let err = WorldPulseConfig::parse("sources:\n  iss:\n    max_errors: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_errors"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = WorldPulseConfig::parse("server: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
