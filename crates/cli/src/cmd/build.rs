//! Build command implementation
//!
//! Runs the configured rules over the source tree.

use clap::Args;
use indexmap::IndexMap;
use jssg_engine::{AbsPath, BuildEnv, BuildRequest, DryRunFileSystem, FileSystem};
use serde_json::Value;
use std::sync::Arc;

use crate::command::Command;
use crate::common::{RuntimeContext, parse_subdir};
use crate::error::{CommandError, Result};
use crate::stats::{BuildStats, print_operations};

/// Build the site
#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Only build files under this subdirectory of the source directory
    #[arg(value_name = "SUBDIR")]
    pub subdir: Option<String>,

    /// Show what would be written without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Add a context value for this build (value parsed as JSON, else a string)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, Value)>,
}

impl Command for BuildCommand {
    type Output = BuildStats;

    fn execute(&self, context: &RuntimeContext) -> Result<BuildStats> {
        let mut settings = context.site_settings()?;

        let dry_run_fs = if self.dry_run {
            let fs = Arc::new(DryRunFileSystem::new(
                AbsPath::new(std::path::absolute(context.source_dir())?)?,
                AbsPath::new(std::path::absolute(context.build_dir())?)?,
            ));
            settings = settings.with_fs(Arc::clone(&fs) as Arc<dyn FileSystem>);
            Some(fs)
        } else {
            None
        };

        let rules = context.rules()?;
        let mut request = BuildRequest::new(rules).with_context(self.call_context());
        if let Some(subdir) = &self.subdir {
            request = request.with_subdir(parse_subdir(subdir)?);
        }

        tracing::debug!(
            source = %context.source_dir().display(),
            build = %context.build_dir().display(),
            dry_run = self.dry_run,
            "Starting build"
        );

        let mut env = BuildEnv::new(settings)?;
        let report = env.build(request)?;

        if let Some(fs) = dry_run_fs {
            print_operations(&fs.operations());
        }

        Ok(BuildStats::from(&report))
    }
}

impl BuildCommand {
    fn call_context(&self) -> IndexMap<String, Value> {
        self.set.iter().cloned().collect()
    }
}

/// Parse `KEY=VALUE`; the value is JSON if it parses, a string otherwise
fn parse_assignment(arg: &str) -> Result<(String, Value)> {
    let (key, value) = arg
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| CommandError::InvalidAssignment(arg.to_string()))?;

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}
