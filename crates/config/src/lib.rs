//! Configuration management for jssg
//!
//! This crate handles:
//! - Loading `jssg.toml` (site directories, context, render defaults)
//! - Declarative rule and listener tables
//! - Data-file variables merged into the user context
//! - Logging initialization

pub mod config;
pub mod logging;
pub mod variables;

// Re-export error types from core
pub use jssg_core::{Error, Result};

// Re-export main types
pub use config::{
    ActionConfig, BuiltinPath, CONFIG_FILE_NAME, Config, ListenerConfig, MatchConfig, PathConfig,
    RuleConfig, SiteConfig, TemplateDirConfig,
};
