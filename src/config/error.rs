//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {var}='{value}': {source}")]
    NumberParseError {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// The tier timeout must be positive.
    #[error("invalid tier timeout '{value}': must be greater than zero")]
    ZeroTimeout { value: u64 },

    /// The front cache capacity must be positive.
    #[error("invalid front cache capacity '{value}': must be greater than zero")]
    ZeroCapacity { value: u64 },
}
