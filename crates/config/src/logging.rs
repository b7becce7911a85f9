//! Logging configuration for the jssg CLI
//!
//! Provides compact terminal output and optional file logging using tracing.

use crate::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging and timestamps
/// * `log_file` - Optional path to append debug logs to
///
/// `RUST_LOG` overrides the terminal filter.
///
/// # Examples
/// ```ignore
/// // Basic usage with info level
/// init(false, None)?;
///
/// // Verbose mode, also writing to a file
/// init(true, Some(Path::new("build.log")))?;
/// ```
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "jssg={level},jssg_engine={level},jssg_config={level},jssg_template={level}"
            ))
        })
        .map_err(|e| jssg_core::Error::Message(format!("Invalid log filter: {e}")))?;

    let file = log_file.map(open_log_file).transpose()?;

    let result = if verbose {
        let stdout_layer = fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_ansi(true)
            .with_filter(env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file.map(file_layer))
            .try_init()
    } else {
        let stdout_layer = fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .without_time() // No timestamps in normal mode
            .compact()
            .with_ansi(true)
            .with_filter(env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file.map(file_layer))
            .try_init()
    };

    result.map_err(|e| jssg_core::Error::Message(format!("Failed to initialize logging: {e}")))
}

fn open_log_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Detailed layer for the log file: always at debug level, no colors
fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .with_filter(EnvFilter::new("debug"))
}
