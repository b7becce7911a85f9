//! # jssg build engine
//!
//! Rule-driven, two-phase static site build engine.
//!
//! - **Rules**: ordered `(matcher, processing)` pairs; the first match owns a file
//! - **Path maps**: route a source path to its input and output paths
//! - **File maps**: the IO that turns an input into an output
//! - **Execution rules**: deferred work plus optional per-file state
//! - **Listeners**: aggregate state across files before anything is written
//! - **Context**: layered values visible to templates and rules
//! - **System Abstraction**: filesystem access abstracted for testing and dry runs
//!
//! ```no_run
//! use jssg_engine::{BuildRequest, BuildRule, FileMap, Matcher, PathMap, SiteSettings};
//!
//! # fn main() -> jssg_engine::Result<()> {
//! let rules = vec![BuildRule::file_map(
//!     Matcher::glob("*.css")?,
//!     PathMap::mirror(),
//!     FileMap::copy(),
//! )];
//! let report = jssg_engine::build(
//!     SiteSettings::new("src", "build", "https://example.org/"),
//!     BuildRequest::new(rules),
//! )?;
//! println!("{} files written", report.executed);
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod context;
pub mod error;
pub mod execution;
pub mod filemap;
pub mod frontmatter;
pub mod listener;
pub mod matcher;
pub mod pathmap;
pub mod rule;
pub mod system;

// Re-export path types from core
pub use jssg_core::path::{AbsPath, RelPath};

pub use error::{Error, Result};

pub use build::{
    BuildEnv, BuildPhase, BuildReport, BuildRequest, FileSelection, SiteSettings, build,
};
pub use context::{Context, ContextBuilder, PageCollection};
pub use execution::{ContextHook, Execution, ExecutionRule, FileMapRule, RenderRule, StateFn};
pub use filemap::FileMap;
pub use listener::{BuildListener, FileState, PageIndex};
pub use matcher::Matcher;
pub use pathmap::PathMap;
pub use rule::{BuildRule, RuleProc, Target};
pub use system::{DryRunFileSystem, FileSystem, Operation, RealFileSystem};
