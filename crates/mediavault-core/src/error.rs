//! Error types for MediaVault configuration.

/// Errors raised while loading configuration.
///
/// These are fatal: they surface once at startup and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required configuration value: {0}")]
    MissingVar(&'static str),

    /// A configuration value could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Name of the offending variable.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Convenience result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
