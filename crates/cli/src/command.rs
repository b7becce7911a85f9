//! Command trait for the jssg CLI
//!
//! Every subcommand implements [`Command`] and receives the shared
//! [`RuntimeContext`].

use crate::common::RuntimeContext;
use crate::error::Result;

/// Trait for all jssg commands
///
/// ```rust,ignore
/// use crate::command::Command;
/// use crate::common::RuntimeContext;
/// use crate::error::Result;
/// use clap::Args;
///
/// #[derive(Debug, Args)]
/// pub struct MyCommand {
///     #[arg(short, long)]
///     pub some_flag: bool,
/// }
///
/// impl Command for MyCommand {
///     type Output = ();
///
///     fn execute(&self, context: &RuntimeContext) -> Result<()> {
///         // context.config, context.source_dir(), context.build_dir()
///         Ok(())
///     }
/// }
/// ```
pub trait Command {
    /// The type returned by this command
    type Output;

    /// Execute the command with the given runtime context
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` if the command fails. Messages should tell
    /// the user which file or setting is at fault.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
