//! Error types for durable-core

use thiserror::Error;

/// Result type alias using durable-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and setup errors
///
/// Failures of an executed operation are reported through
/// [`ExecutorError`](crate::retry::ExecutorError) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown durability level name
    #[error("Unknown durability level: {level}. Valid levels: none, majority, majority-and-persist-active, persist-to-majority")]
    InvalidDurability { level: String },

    /// Unknown retry strategy name
    #[error("Unknown retry strategy: {strategy}. Valid strategies: none, fixed-delay, exponential-backoff, linear-backoff")]
    InvalidStrategy { strategy: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid durability level error
    pub fn invalid_durability(level: impl Into<String>) -> Self {
        Self::InvalidDurability {
            level: level.into(),
        }
    }

    /// Create an invalid retry strategy error
    pub fn invalid_strategy(strategy: impl Into<String>) -> Self {
        Self::InvalidStrategy {
            strategy: strategy.into(),
        }
    }
}
