//! Error types for jssg-engine
//!
//! Every failure that happens while a file is being processed carries the
//! relative path of that file and the index of the rule that owns it.

use jssg_core::path::{AbsPath, RelPath};
use thiserror::Error;

/// Result type alias for jssg-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jssg-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid rules, listeners or settings, detected before any file is walked
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// A rule's matcher failed on a path
    #[error("Matcher of rule {rule} failed on {path}: {source}")]
    Match {
        /// Source-relative path being processed
        path: RelPath,
        /// Index of the owning rule
        rule: usize,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// A rule's path map failed on a path
    #[error("Path map of rule {rule} failed on {path}: {source}")]
    PathMap {
        /// Source-relative path being processed
        path: RelPath,
        /// Index of the owning rule
        rule: usize,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// An execution rule failed while collecting a path
    #[error("Collecting {path} with rule {rule} failed: {source}")]
    Collect {
        /// Source-relative path being processed
        path: RelPath,
        /// Index of the owning rule
        rule: usize,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// A listener hook failed
    #[error("Listener '{name}' failed: {source}")]
    Listener {
        /// Listener name
        name: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// A deferred execution failed
    #[error("Executing {path} with rule {rule} failed: {source}")]
    Execution {
        /// Source-relative path being processed
        path: RelPath,
        /// Index of the owning rule
        rule: usize,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// Error reading a file
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        /// Absolute path involved
        path: AbsPath,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Error writing a file
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        /// Absolute path involved
        path: AbsPath,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Error creating a directory
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Absolute path involved
        path: AbsPath,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Error walking the source tree
    #[error("Failed to walk {path}: {source}")]
    Walk {
        /// Absolute path involved
        path: AbsPath,
        /// Underlying error
        #[source]
        source: walkdir::Error,
    },

    /// Invalid UTF-8 in a file read as text
    #[error("Invalid UTF-8 in {path}: {source}")]
    InvalidUtf8 {
        /// Absolute path involved
        path: AbsPath,
        /// Underlying error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Template rendering error
    #[error("Template rendering failed for {name}: {message}")]
    Render {
        /// Template name
        name: String,
        /// Renderer message
        message: String,
    },

    /// A path could not be represented as a source or build path
    #[error(transparent)]
    Path(jssg_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    Other {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

// Convert from jssg_core::Error
impl From<jssg_core::Error> for Error {
    fn from(err: jssg_core::Error) -> Self {
        match err {
            jssg_core::Error::Io(e) => Error::Io(e),
            jssg_core::Error::Render { name, message } => Error::Render { name, message },
            jssg_core::Error::Config(message) => Error::Configuration { message },
            other => Error::Path(other),
        }
    }
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a foreign error, such as a parse failure in user content
    pub fn other(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Other {
            context: context.into(),
            source: source.into(),
        }
    }

    /// The source-relative path this error was raised for, if any
    pub fn path(&self) -> Option<&RelPath> {
        match self {
            Error::Match { path, .. }
            | Error::PathMap { path, .. }
            | Error::Collect { path, .. }
            | Error::Execution { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Index of the rule this error was raised for, if any
    pub fn rule(&self) -> Option<usize> {
        match self {
            Error::Match { rule, .. }
            | Error::PathMap { rule, .. }
            | Error::Collect { rule, .. }
            | Error::Execution { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}
