//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup so that
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: worldpulse_core::config::ConfigError,
    },

    /// The shared HTTP client could not be built.
    #[error("source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: worldpulse_core::source::SourceError,
    },

    /// The hub failed to start.
    #[error("hub error: {source}")]
    Hub {
        /// The underlying startup error.
        #[from]
        source: worldpulse_hub::StartupError,
    },

    /// A signal handler could not be installed.
    #[error("signal error: {message}")]
    Signal {
        /// Description of the failure.
        message: String,
    },
}
