//! File maps
//!
//! A file map performs the IO that turns a resolved input into a resolved
//! output. It runs during execution, after every file has been collected.

use crate::context::Context;
use crate::error::Result;
use jssg_core::path::RelPath;
use std::fmt;
use std::sync::Arc;

/// Signature of a file map
pub type FileMapFn = dyn Fn(&Context, &RelPath, &RelPath) -> Result<()>;

/// Produces an output file from an input file
#[derive(Clone)]
pub struct FileMap {
    name: &'static str,
    f: Arc<FileMapFn>,
}

impl FileMap {
    /// Wrap a file map callable
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context, &RelPath, &RelPath) -> Result<()> + 'static,
    {
        Self {
            name: "custom",
            f: Arc::new(f),
        }
    }

    /// Copy the input unchanged
    pub fn copy() -> Self {
        Self {
            name: "copy",
            f: Arc::new(|ctx, input, output| ctx.fs().copy(input, output)),
        }
    }

    /// Claim the file and do nothing
    pub fn ignore() -> Self {
        Self {
            name: "ignore",
            f: Arc::new(|_, _, _| Ok(())),
        }
    }

    /// Read the input as text and write `f(text)` to the output
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        Self {
            name: "transform",
            f: Arc::new(move |ctx, input, output| {
                let text = ctx.fs().read_to_string(input)?;
                ctx.fs().write(output, f(&text).as_bytes())
            }),
        }
    }

    /// Run the file map
    ///
    /// # Errors
    ///
    /// Returns IO errors and whatever error the wrapped function raises
    pub fn apply(&self, ctx: &Context, input: &RelPath, output: &RelPath) -> Result<()> {
        (self.f)(ctx, input, output)
    }

    /// Name of the built-in map, or `custom`
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for FileMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMap({})", self.name)
    }
}
