//! CLI command implementations

pub mod build;
pub mod info;
pub mod rules;
