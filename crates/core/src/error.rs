//! Base error types for jssg
//!
//! This module provides the foundation error types that all crates can use.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path is not absolute
    #[error("Path must be absolute: {}", path.display())]
    PathNotAbsolute {
        /// Offending path
        path: PathBuf,
    },

    /// Path is not relative
    #[error("Path must be relative: {}", path.display())]
    PathNotRelative {
        /// Offending path
        path: PathBuf,
    },

    /// Relative path climbs out of its root
    #[error("Path must stay inside its root: {}", path.display())]
    PathEscapesRoot {
        /// Offending path
        path: PathBuf,
    },

    /// Invalid path prefix
    #[error("Path {} is not under base directory {}", path.display(), base.display())]
    InvalidPathPrefix {
        /// Path that was stripped
        path: Arc<PathBuf>,
        /// Expected base directory
        base: Arc<PathBuf>,
    },

    /// Template rendering failed in a collaborator
    #[error("Render error in {name}: {message}")]
    Render {
        /// Template name
        name: String,
        /// Renderer message
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
