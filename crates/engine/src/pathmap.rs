//! Path maps
//!
//! A path map turns the walked source path into the pair
//! `(input, output)`: the source file to read and the build file to produce.
//! Path maps are pure; they run during collection and never touch the disk.

use crate::context::Context;
use crate::error::Result;
use jssg_core::path::RelPath;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Signature of a full path map
pub type PathMapFn = dyn Fn(&Context, &RelPath) -> Result<(RelPath, RelPath)>;

/// Maps a walked source path to its input and output paths
#[derive(Clone)]
pub struct PathMap {
    name: &'static str,
    f: Arc<PathMapFn>,
}

impl PathMap {
    /// Wrap a full path map
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context, &RelPath) -> Result<(RelPath, RelPath)> + 'static,
    {
        Self {
            name: "custom",
            f: Arc::new(f),
        }
    }

    /// Wrap a mapping that only computes the output path
    ///
    /// The input is the walked path itself.
    pub fn output<F>(f: F) -> Self
    where
        F: Fn(&RelPath) -> Result<RelPath> + 'static,
    {
        Self::new(move |_, path| Ok((path.clone(), f(path)?)))
    }

    fn builtin<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&RelPath) -> Result<RelPath> + 'static,
    {
        Self {
            name,
            f: Arc::new(move |_, path| Ok((path.clone(), f(path)?))),
        }
    }

    /// Output path equals input path
    pub fn mirror() -> Self {
        Self::builtin("mirror", |path| Ok(path.clone()))
    }

    /// Replace every extension with `ext` (with or without the leading dot)
    pub fn replace_extensions(ext: impl Into<String>) -> Self {
        let ext = ext.into();
        Self::builtin("replace_extensions", move |path| replace_extensions(path, &ext))
    }

    /// Strip every extension
    pub fn remove_extensions() -> Self {
        Self::builtin("remove_extensions", remove_extensions)
    }

    /// Keep only the last extension
    pub fn remove_internal_extensions() -> Self {
        Self::builtin("remove_internal_extensions", remove_internal_extensions)
    }

    /// Replace every extension with `.html`
    pub fn to_html() -> Self {
        Self::builtin("html", |path| replace_extensions(path, ".html"))
    }

    /// `about.html` becomes `about/index.html`
    pub fn nice_url() -> Self {
        Self::builtin("nice_url", nice_url)
    }

    /// Apply the map
    ///
    /// # Errors
    ///
    /// Returns whatever error the wrapped function raises
    pub fn apply(&self, ctx: &Context, path: &RelPath) -> Result<(RelPath, RelPath)> {
        (self.f)(ctx, path)
    }

    /// Name of the built-in map, or `custom`
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for PathMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathMap({})", self.name)
    }
}

fn strip_all_extensions(path: &Path) -> PathBuf {
    let mut stripped = path.to_path_buf();
    while stripped.extension().is_some() {
        stripped.set_extension("");
    }
    stripped
}

/// Replace every extension of `path` with `ext`
///
/// ```
/// use jssg_engine::RelPath;
/// use jssg_engine::pathmap::replace_extensions;
///
/// let p = RelPath::parse("path/abc.xyz.def").unwrap();
/// assert_eq!(replace_extensions(&p, ".txt").unwrap().to_string(), "path/abc.txt");
/// ```
pub fn replace_extensions(path: &RelPath, ext: &str) -> Result<RelPath> {
    let mut stripped = strip_all_extensions(path.as_path());
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    if !ext.is_empty() {
        stripped.set_extension(ext);
    }
    Ok(RelPath::new(stripped)?)
}

/// Strip every extension of `path`
pub fn remove_extensions(path: &RelPath) -> Result<RelPath> {
    replace_extensions(path, "")
}

/// Keep only the last extension of `path`
pub fn remove_internal_extensions(path: &RelPath) -> Result<RelPath> {
    let last = path
        .as_path()
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    replace_extensions(path, &last)
}

/// Map `dir/name.ext` to `dir/name/index.html`
pub fn nice_url(path: &RelPath) -> Result<RelPath> {
    Ok(RelPath::new(
        strip_all_extensions(path.as_path()).join("index.html"),
    )?)
}
