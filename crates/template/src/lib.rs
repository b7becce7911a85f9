//! # jssg Template
//!
//! Template engine integration for jssg using minijinja.
//!
//! This crate provides the renderer the build engine calls through
//! [`jssg_core::TemplateRenderer`], with markdown and date filters and a
//! loader that searches plain and prefixed template directories.

pub mod engine;
pub mod filters;

pub use engine::{PUSH_FUNCTION, TemplateEngine};

use thiserror::Error;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, Error>;

/// Template engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Template rendering error
    #[error("Template error at {location}: {message}")]
    Render {
        /// Template name and line, when known
        location: String,
        /// Renderer message
        message: String,
    },

    /// Template could not be found by any loader
    #[error("{0}")]
    NotFound(String),
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        if err.kind() == minijinja::ErrorKind::TemplateNotFound {
            return Error::NotFound(err.to_string());
        }

        let location = match (err.name(), err.line()) {
            (Some(name), Some(line)) => format!("{name} line {line}"),
            (Some(name), None) => name.to_string(),
            (None, Some(line)) => format!("line {line}"),
            (None, None) => "unknown location".to_string(),
        };

        Error::Render {
            location,
            message: err.to_string(),
        }
    }
}
