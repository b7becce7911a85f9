//! Build summary output

use jssg_engine::{BuildReport, Operation};
use owo_colors::OwoColorize;

/// Counters shown after a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    walked: usize,
    matched: usize,
    skipped: usize,
    executed: usize,
    states: usize,
}

impl From<&BuildReport> for BuildStats {
    fn from(report: &BuildReport) -> Self {
        Self {
            walked: report.walked,
            matched: report.matched,
            skipped: report.skipped,
            executed: report.executed,
            states: report.states,
        }
    }
}

impl BuildStats {
    /// Files found under the walked directory
    pub fn walked(&self) -> usize {
        self.walked
    }

    /// Files claimed by a rule
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Files no rule claimed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Deferred executions that ran
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// States delivered to listeners
    pub fn states(&self) -> usize {
        self.states
    }

    /// Print the one-line build summary
    pub fn print_summary(&self, dry_run: bool) {
        if dry_run {
            println!(
                "{} {} would be built",
                "●".bright_green(),
                self.executed.to_string().bright_white().bold()
            );
        } else {
            println!(
                "{} {} built",
                "●".bright_green(),
                self.executed.to_string().bright_green().bold()
            );
        }

        let mut parts = vec![format!("{} files", self.walked)];
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if self.states > 0 {
            parts.push(format!("{} pages indexed", self.states));
        }
        println!("  {}", parts.join(", ").dimmed());
    }
}

/// Print the writes a dry run recorded
pub fn print_operations(operations: &[Operation]) {
    for operation in operations {
        match operation {
            Operation::Write { path, size } => println!(
                "  {} {} {}",
                "write".cyan(),
                path,
                format!("({size} bytes)").dimmed()
            ),
            Operation::Copy { from, to } => println!(
                "  {} {} {} {}",
                "copy".cyan(),
                from.dimmed(),
                "→".dimmed(),
                to
            ),
        }
    }
}
