//! Core types and utilities for jssg
//!
//! This is the foundation crate (Layer 0) that all other jssg crates depend on.
//! It provides:
//! - Path types (`AbsPath`, `RelPath`)
//! - Base error types
//! - The `TemplateRenderer` collaborator trait used by the build engine
//!
//! This crate has no dependencies on other jssg crates.

pub mod error;
pub mod path;
pub mod traits;

pub use error::{Error, Result};
pub use traits::TemplateRenderer;
