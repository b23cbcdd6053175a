//! Engine construction errors.

use std::fmt;
use std::path::PathBuf;

/// Error type for building the HTTP engine.
#[derive(Debug)]
pub enum EngineError {
    /// Failed to read the root CA file.
    CertificateRead { path: PathBuf, error: std::io::Error },
    /// The root CA file is not valid PEM.
    CertificateParse { path: PathBuf, error: reqwest::Error },
    /// The underlying client rejected the configuration.
    Client(reqwest::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::CertificateRead { path, error } => {
                write!(f, "failed to read certificate {}: {}", path.display(), error)
            }
            EngineError::CertificateParse { path, error } => {
                write!(f, "bad certificate {}: {}", path.display(), error)
            }
            EngineError::Client(error) => write!(f, "failed to build HTTP client: {}", error),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::CertificateRead { error, .. } => Some(error),
            EngineError::CertificateParse { error, .. } => Some(error),
            EngineError::Client(error) => Some(error),
        }
    }
}
