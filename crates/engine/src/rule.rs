//! Build rules
//!
//! A rule pairs a [`Matcher`] with what to do with the files it claims.
//! Rules are tried in declaration order and the first match owns the file.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::execution::{ExecutionRule, RenderRule};
use crate::filemap::FileMap;
use crate::matcher::Matcher;
use crate::pathmap::PathMap;
use jssg_config::{ActionConfig, BuiltinPath, MatchConfig, PathConfig, RuleConfig};
use jssg_core::path::RelPath;
use std::fmt;
use std::sync::Arc;

/// Signature of a plain rule callable
pub type RuleFn = dyn Fn(&Context, &RelPath) -> Result<()>;

/// What happens to a resolved `(input, output)` pair
#[derive(Clone)]
pub enum Target {
    /// Run a file map during execution; no state
    FileMap(FileMap),
    /// Full execution rule, may report state
    Execution(Arc<dyn ExecutionRule>),
}

/// How a rule processes the files it claims
#[derive(Clone)]
pub enum RuleProc {
    /// Called with the walked path during execution
    Callable(Arc<RuleFn>),
    /// Path map during collection, then the target
    Mapped {
        /// Resolves input and output paths
        path_map: PathMap,
        /// Processes the resolved pair
        target: Target,
    },
}

impl RuleProc {
    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            RuleProc::Callable(_) => "callable".to_string(),
            RuleProc::Mapped { path_map, target } => {
                let target = match target {
                    Target::FileMap(file_map) => file_map.name(),
                    Target::Execution(_) => "execution rule",
                };
                format!("{} -> {}", path_map.name(), target)
            }
        }
    }
}

/// An ordered `(matcher, processing)` pair
#[derive(Clone)]
pub struct BuildRule {
    matcher: Matcher,
    proc: RuleProc,
    label: Option<String>,
}

impl BuildRule {
    /// Pair a matcher with a processing step
    pub fn new(matcher: Matcher, proc: RuleProc) -> Self {
        Self {
            matcher,
            proc,
            label: None,
        }
    }

    /// Path map plus file map
    pub fn file_map(matcher: Matcher, path_map: PathMap, file_map: FileMap) -> Self {
        Self::new(
            matcher,
            RuleProc::Mapped {
                path_map,
                target: Target::FileMap(file_map),
            },
        )
    }

    /// Path map plus execution rule
    pub fn execution<R>(matcher: Matcher, path_map: PathMap, rule: R) -> Self
    where
        R: ExecutionRule + 'static,
    {
        Self::new(
            matcher,
            RuleProc::Mapped {
                path_map,
                target: Target::Execution(Arc::new(rule)),
            },
        )
    }

    /// Plain callable, deferred to execution
    pub fn callable<F>(matcher: Matcher, f: F) -> Self
    where
        F: Fn(&Context, &RelPath) -> Result<()> + 'static,
    {
        Self::new(matcher, RuleProc::Callable(Arc::new(f)))
    }

    /// Attach a label shown by `describe`
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build an engine rule from a `[[rules]]` table entry
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed glob patterns
    pub fn from_config(config: &RuleConfig) -> Result<Self> {
        let matcher = match &config.matcher {
            MatchConfig::One(pattern) => Matcher::glob(pattern)?,
            MatchConfig::Many(patterns) => Matcher::any_of(patterns)?,
        };

        let path_map = match &config.path {
            PathConfig::Builtin(BuiltinPath::Mirror) => PathMap::mirror(),
            PathConfig::Builtin(BuiltinPath::Html) => PathMap::to_html(),
            PathConfig::Builtin(BuiltinPath::NiceUrl) => PathMap::nice_url(),
            PathConfig::Builtin(BuiltinPath::RemoveExtensions) => PathMap::remove_extensions(),
            PathConfig::Builtin(BuiltinPath::RemoveInternalExtensions) => {
                PathMap::remove_internal_extensions()
            }
            PathConfig::ReplaceExtensions { replace_extensions } => {
                PathMap::replace_extensions(replace_extensions.clone())
            }
        };

        let render = |markdown: bool| {
            let rule = match &config.kind {
                Some(kind) => RenderRule::named(kind.clone()),
                None => RenderRule::new(),
            };
            rule.markdown(markdown).front_matter(config.front_matter)
        };

        let rule = match config.action {
            ActionConfig::Copy => Self::file_map(matcher, path_map, FileMap::copy()),
            ActionConfig::Ignore => Self::file_map(matcher, path_map, FileMap::ignore()),
            ActionConfig::Render => Self::execution(matcher, path_map, render(false)),
            ActionConfig::Markdown => Self::execution(matcher, path_map, render(true)),
        };

        if config.kind.is_some()
            && matches!(config.action, ActionConfig::Copy | ActionConfig::Ignore)
        {
            tracing::warn!(
                "Rule {:?} sets a kind but its action reports no pages",
                config.matcher.patterns()
            );
        }

        Ok(rule.with_label(format!("{:?}", config.action).to_lowercase()))
    }

    /// Build engine rules from every `[[rules]]` entry, in order
    ///
    /// # Errors
    ///
    /// Returns the first configuration error, naming the rule index
    pub fn from_configs(configs: &[RuleConfig]) -> Result<Vec<Self>> {
        configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                Self::from_config(config).map_err(|e| match e {
                    Error::Configuration { message } => {
                        Error::configuration(format!("rule {index}: {message}"))
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// The matcher
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The processing step
    pub fn proc(&self) -> &RuleProc {
        &self.proc
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!(
                "{} => {} ({})",
                self.matcher.describe(),
                self.proc.describe(),
                label
            ),
            None => format!("{} => {}", self.matcher.describe(), self.proc.describe()),
        }
    }
}

impl fmt::Debug for BuildRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildRule({})", self.describe())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::path::Path;

    fn config(toml: &str) -> RuleConfig {
        let mut config = jssg_config::Config::from_toml_str(toml, Path::new("/site")).unwrap();
        config.rules.remove(0)
    }

    #[test]
    fn test_from_config_markdown() {
        let rule = BuildRule::from_config(&config(
            r#"
[[rules]]
match = "*.md"
path = "html"
action = "markdown"
kind = "post"
"#,
        ))
        .unwrap();

        assert_eq!(rule.describe(), "*.md => html -> execution rule (markdown)");
        assert!(
            rule.matcher()
                .matches(&RelPath::parse("posts/a.md").unwrap())
                .unwrap()
        );
    }

    #[test]
    fn test_from_config_copy_many() {
        let rule = BuildRule::from_config(&config(
            r#"
[[rules]]
match = ["*.css", "*.js"]
action = "copy"
"#,
        ))
        .unwrap();

        assert_eq!(rule.describe(), "*.css | *.js => mirror -> copy (copy)");
    }

    #[test]
    fn test_from_configs_names_rule_index() {
        let good = config("[[rules]]\nmatch = \"*\"\naction = \"copy\"\n");
        let bad = config("[[rules]]\nmatch = \"a[\"\naction = \"copy\"\n");

        let err = BuildRule::from_configs(&[good, bad]).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("rule 1"));
    }

    #[test]
    fn test_callable_describe() {
        let rule = BuildRule::callable(Matcher::glob("*").unwrap(), |_, _| Ok(()));
        assert_eq!(rule.describe(), "* => callable");
    }
}
