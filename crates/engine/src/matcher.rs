//! Rule matchers
//!
//! A matcher decides whether a rule claims a source file. Globs use
//! `fnmatch` semantics: `*` also matches `/`, so `*.md` claims `posts/a.md`.
//!
//! Example:
//! ```
//! use jssg_engine::matcher::Matcher;
//! use jssg_engine::RelPath;
//!
//! let m = Matcher::any_of(["*.css", "*.js"]).unwrap();
//! assert!(m.matches(&RelPath::parse("assets/site.js").unwrap()).unwrap());
//! ```

use crate::error::{Error, Result};
use glob::Pattern;
use jssg_core::path::RelPath;
use std::fmt;
use std::sync::Arc;

/// Signature of a predicate matcher
pub type PredicateFn = dyn Fn(&RelPath) -> Result<bool>;

/// Decides whether a rule claims a path
#[derive(Clone)]
pub enum Matcher {
    /// A single glob pattern
    Glob(Pattern),
    /// Any of several glob patterns
    AnyOf(Vec<Pattern>),
    /// A user predicate; errors abort the build
    Predicate(Arc<PredicateFn>),
}

impl Matcher {
    /// Compile a glob pattern
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is malformed
    pub fn glob(pattern: &str) -> Result<Self> {
        compile(pattern).map(Matcher::Glob)
    }

    /// Compile several glob patterns; the matcher accepts a path if any does
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any pattern is malformed
    pub fn any_of<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Matcher::AnyOf)
    }

    /// Wrap a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&RelPath) -> Result<bool> + 'static,
    {
        Matcher::Predicate(Arc::new(f))
    }

    /// Test a path
    ///
    /// # Errors
    ///
    /// Only predicate matchers can fail; their error is returned as is
    pub fn matches(&self, path: &RelPath) -> Result<bool> {
        match self {
            Matcher::Glob(pattern) => Ok(pattern.matches(&path.to_slash_string())),
            Matcher::AnyOf(patterns) => {
                let path = path.to_slash_string();
                Ok(patterns.iter().any(|p| p.matches(&path)))
            }
            Matcher::Predicate(f) => f(path),
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            Matcher::Glob(pattern) => pattern.as_str().to_string(),
            Matcher::AnyOf(patterns) => patterns
                .iter()
                .map(Pattern::as_str)
                .collect::<Vec<_>>()
                .join(" | "),
            Matcher::Predicate(_) => "<predicate>".to_string(),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.describe())
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| Error::configuration(format!("invalid glob pattern '{pattern}': {e}")))
}
