//! Type-safe path types
//!
//! This module provides two distinct path types using the newtype pattern:
//!
//! - [`AbsPath`]: Absolute filesystem paths (the source and build roots)
//! - [`RelPath`]: Paths relative to the source or build root
//!
//! User-facing code (matchers, path maps, file maps) only ever sees
//! [`RelPath`]; the filesystem handle resolves them against a root.
//!
//! # Examples
//!
//! ```
//! use jssg_core::path::{AbsPath, RelPath};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = AbsPath::new("/srv/site".into())?;
//! let post = RelPath::new("posts/hello.md".into())?;
//!
//! let full = root.join(&post);
//! assert_eq!(full.as_path().to_str().unwrap(), "/srv/site/posts/hello.md");
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// An absolute path on the filesystem
///
/// This type guarantees that the path is absolute (starts with `/` on Unix or a drive letter on Windows).
/// Use this for file operations and as base directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbsPath(PathBuf);

impl AbsPath {
    /// Create a new `AbsPath` from a `PathBuf`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute.
    ///
    /// # Examples
    ///
    /// ```
    /// use jssg_core::path::AbsPath;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let abs = AbsPath::new("/srv/site".into())?;
    /// assert!(abs.as_path().is_absolute());
    ///
    /// let err = AbsPath::new("relative/path".into());
    /// assert!(err.is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(path: PathBuf) -> Result<Self> {
        if path.is_absolute() {
            Ok(AbsPath(path))
        } else {
            Err(Error::PathNotAbsolute { path })
        }
    }

    /// Create a new `AbsPath` from a reference to a `Path`
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::new(path.to_path_buf())
    }

    /// Get the underlying `Path`
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Join with a relative path to create a new absolute path
    pub fn join(&self, rel: &RelPath) -> Self {
        AbsPath(self.0.join(rel.as_path()))
    }

    /// Get the parent directory
    ///
    /// Returns `None` if this is the root directory.
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| AbsPath(p.to_path_buf()))
    }

    /// Strip a base directory prefix to get a relative path
    ///
    /// # Errors
    ///
    /// Returns an error if `self` is not under `base`.
    ///
    /// # Examples
    ///
    /// ```
    /// use jssg_core::path::AbsPath;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let root = AbsPath::new("/srv/site".into())?;
    /// let file = AbsPath::new("/srv/site/index.html".into())?;
    /// let rel = file.strip_prefix(&root)?;
    /// assert_eq!(rel.to_slash_string(), "index.html");
    /// # Ok(())
    /// # }
    /// ```
    pub fn strip_prefix(&self, base: &AbsPath) -> Result<RelPath> {
        self.0
            .strip_prefix(&base.0)
            .map(|p| RelPath(p.to_path_buf()))
            .map_err(|_| Error::InvalidPathPrefix {
                path: std::sync::Arc::new(self.as_path().to_path_buf()),
                base: std::sync::Arc::new(base.as_path().to_path_buf()),
            })
    }

    /// Get the file name
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|s| s.to_str())
    }
}

/// A relative path (no leading slash)
///
/// Scoped to either the source root or the build root; which one is decided
/// by the code that resolves it, not by the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PathBuf")]
pub struct RelPath(PathBuf);

impl RelPath {
    /// Create a new `RelPath` from a `PathBuf`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is absolute or climbs out of its root
    /// through a `..` component.
    pub fn new(path: PathBuf) -> Result<Self> {
        if !path.is_relative() {
            return Err(Error::PathNotRelative { path });
        }
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(Error::PathEscapesRoot { path });
        }
        Ok(RelPath(path))
    }

    /// Parse a `/`-separated string into a `RelPath`
    ///
    /// # Examples
    ///
    /// ```
    /// use jssg_core::path::RelPath;
    ///
    /// let rel = RelPath::parse("posts/a.md").unwrap();
    /// assert_eq!(rel.file_name(), Some("a.md"));
    /// assert!(RelPath::parse("/etc/passwd").is_err());
    /// assert!(RelPath::parse("../outside").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self> {
        Self::new(PathBuf::from(path))
    }

    /// Get the underlying `Path`
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Join with another relative path
    pub fn join(&self, other: &RelPath) -> Self {
        RelPath(self.0.join(&other.0))
    }

    /// Get the parent directory
    ///
    /// Returns `None` if this is a single component path.
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| RelPath(p.to_path_buf()))
    }

    /// Get the file name
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|s| s.to_str())
    }

    /// Render the path with `/` separators regardless of platform
    ///
    /// Glob matching and URL building both work on this form.
    pub fn to_slash_string(&self) -> String {
        self.0
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl TryFrom<PathBuf> for RelPath {
    type Error = Error;

    fn try_from(path: PathBuf) -> Result<Self> {
        Self::new(path)
    }
}

impl std::fmt::Display for AbsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_slash_string())
    }
}
