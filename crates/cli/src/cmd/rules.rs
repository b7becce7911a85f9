//! Rules command implementation
//!
//! Show which rule owns each source file without building anything.

use clap::Args;
use jssg_engine::{BuildEnv, BuildRule, FileSelection, RelPath};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::{RuntimeContext, parse_subdir};
use crate::error::Result;

/// Show the owning rule of every source file
#[derive(Debug, Args)]
pub struct RulesCommand {
    /// Only list files under this subdirectory of the source directory
    #[arg(value_name = "SUBDIR")]
    pub subdir: Option<String>,
}

/// One classified source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Source-relative path
    pub path: RelPath,
    /// Index of the owning rule, if any
    pub rule: Option<usize>,
}

impl Command for RulesCommand {
    type Output = Vec<Ownership>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<Ownership>> {
        let rules = context.rules()?;
        let files = match self.subdir.as_deref() {
            Some(subdir) => FileSelection::Subdir(parse_subdir(subdir)?),
            None => FileSelection::All,
        };

        let env = BuildEnv::new(context.site_settings()?)?;
        let owners: Vec<Ownership> = env
            .classify(&files, &rules)?
            .into_iter()
            .map(|(path, rule)| Ownership { path, rule })
            .collect();

        display(&owners, &rules);
        Ok(owners)
    }
}

fn display(owners: &[Ownership], rules: &[BuildRule]) {
    let width = owners
        .iter()
        .map(|o| o.path.to_slash_string().len())
        .max()
        .unwrap_or(0);

    for owner in owners {
        let path = owner.path.to_slash_string();
        match owner.rule {
            Some(index) => println!(
                "  {} {path:width$}  {} {}",
                "✓".bright_green(),
                format!("#{index}").cyan(),
                rules[index].describe().dimmed()
            ),
            None => println!(
                "  {} {:width$}  {}",
                "-".dimmed(),
                path.dimmed(),
                "skipped".dimmed()
            ),
        }
    }

    let skipped = owners.iter().filter(|o| o.rule.is_none()).count();
    println!();
    println!(
        "{} {} matched, {} skipped",
        "●".bright_green(),
        (owners.len() - skipped).to_string().bright_white().bold(),
        skipped
    );
}
