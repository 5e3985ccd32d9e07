//! Error types for command virtualization

use thiserror::Error;

/// Unified error type for building and wrapping commands
#[derive(Error, Debug)]
pub enum Error {
    /// A required input was missing or empty
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the input
        reason: String,
    },

    /// A path string could not be normalized
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path, lossily rendered
        path: String,
        /// Why normalization rejected it
        reason: String,
    },

    /// Failed to parse a YAML container spec
    #[error("failed to parse container spec: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
