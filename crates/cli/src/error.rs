//! Error types for CLI commands

use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The build itself failed
    #[error(transparent)]
    BuildError(#[from] jssg_engine::Error),

    /// A `--set key=value` argument could not be parsed
    #[error("Invalid assignment '{0}': expected KEY=VALUE")]
    InvalidAssignment(String),

    /// Invalid subdirectory argument
    #[error("Invalid subdirectory '{path}': {reason}")]
    InvalidSubdir {
        /// The argument as given
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<jssg_core::Error> for CommandError {
    fn from(err: jssg_core::Error) -> Self {
        match err {
            jssg_core::Error::Config(message) => Self::ConfigError(message.into()),
            jssg_core::Error::Io(e) => Self::IoError(e),
            other => Self::Other(other.into()),
        }
    }
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

impl CommandError {
    /// Create a `ConfigError` from any error type
    pub fn config<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::ConfigError(Box::new(err))
    }
}
