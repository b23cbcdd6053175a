//! Configuration error types.

use std::fmt;

/// Error type for assembling the run configuration from CLI flags.
#[derive(Debug)]
pub enum ConfigError {
    /// A flag value failed to parse.
    Parse {
        flag: String,
        value: String,
        error: String,
    },
    /// A flag value parsed but is not acceptable.
    Invalid { flag: String, message: String },
}

impl ConfigError {
    pub fn parse(flag: &str, value: &str, error: impl fmt::Display) -> Self {
        ConfigError::Parse {
            flag: flag.to_string(),
            value: value.to_string(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { flag, value, error } => {
                write!(f, "failed to parse --{} '{}': {}", flag, value, error)
            }
            ConfigError::Invalid { flag, message } => {
                write!(f, "invalid value for --{}: {}", flag, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
