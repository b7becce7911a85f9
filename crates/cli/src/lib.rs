//! jssg CLI library
//!
//! All CLI logic lives here so it can be tested without spawning the binary.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;
pub mod stats;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use command::Command;
use common::{RuntimeContext, SiteOverrides};

/// jssg - a rule-driven static site builder
#[derive(Parser)]
#[command(name = "jssg")]
#[command(about = "Build a static site from a source tree and a set of rules")]
#[command(version)]
#[command(long_about = "Build a static site from a source tree and a set of rules

Every file under the source directory is given to the first rule that
matches it. Rules are collected for every file before anything is written,
so index pages can list every post.

Configuration is read from jssg.toml in the current directory unless
--config says otherwise.")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, env = "JSSG_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Source directory (overrides site.source)
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Build directory (overrides site.build)
    #[arg(long, value_name = "DIR")]
    pub build: Option<PathBuf>,

    /// Public base URL (overrides site.base_url)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file
    #[arg(long, env = "JSSG_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for jssg CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Build the site
    Build(cmd::build::BuildCommand),

    /// Show which rule owns each source file
    Rules(cmd::rules::RulesCommand),

    /// Display the resolved configuration
    Info(cmd::info::InfoCommand),
}

fn execute_command(command: &Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Build(build_cmd) => {
            let stats = build_cmd.execute(context)?;
            println!();
            stats.print_summary(build_cmd.dry_run);
        }
        Commands::Rules(rules_cmd) => {
            rules_cmd.execute(context)?;
        }
        Commands::Info(info_cmd) => {
            info_cmd.execute(context)?;
        }
    }

    Ok(())
}

/// Run the CLI
///
/// # Errors
///
/// Returns the first error from logging setup, configuration loading or the command
pub fn run(cli: Cli) -> Result<()> {
    jssg_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let explicit = cli.config.is_some();
    let config_path = cli.config.clone().unwrap_or_else(common::default_config_path);
    let overrides = SiteOverrides {
        source: cli.source.clone(),
        build: cli.build.clone(),
        base_url: cli.base_url.clone(),
    };

    let context = RuntimeContext::load(&config_path, explicit, overrides)?;
    execute_command(&cli.command, &context)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "jssg",
            "--base-url",
            "https://example.org/",
            "build",
            "posts",
            "-n",
            "--set",
            "draft=true",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("https://example.org/"));
        match cli.command {
            Commands::Build(cmd) => {
                assert_eq!(cmd.subdir.as_deref(), Some("posts"));
                assert!(cmd.dry_run);
                assert_eq!(cmd.set, vec![("draft".to_string(), serde_json::json!(true))]);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_assignment() {
        assert!(Cli::try_parse_from(["jssg", "build", "--set", "oops"]).is_err());
    }
}
