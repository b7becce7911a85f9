//! Configuration management
//!
//! This module handles loading the `jssg.toml` site configuration.

use crate::Result;
use crate::variables::{load_data_dir, merge_variables};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "jssg.toml";

/// Site section: directories and the public base URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Source directory, relative to the config file
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Build (output) directory, relative to the config file
    #[serde(default = "default_build")]
    pub build: PathBuf,

    /// Public base URL, prepended to every page href
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Template search directories, searched in order
    #[serde(default)]
    pub templates: Vec<PathBuf>,

    /// Template directories addressed through a name prefix (`prefix/name`)
    #[serde(default)]
    pub prefixed_templates: Vec<TemplateDirConfig>,

    /// Directory of `*.toml` data files merged into the user context
    #[serde(default)]
    pub data: Option<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
            base_url: default_base_url(),
            templates: Vec::new(),
            prefixed_templates: Vec::new(),
            data: None,
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_base_url() -> String {
    "/".to_string()
}

/// A template directory reachable under a prefix
///
/// ```toml
/// [[site.prefixed_templates]]
/// path = "layouts"
/// prefix = "x"      # templates are found as "x/<name>"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDirConfig {
    /// Directory holding the templates
    pub path: PathBuf,

    /// Prefix used in template names; defaults to the directory as written
    #[serde(default)]
    pub prefix: Option<String>,
}

impl TemplateDirConfig {
    /// The prefix templates in this directory are addressed with
    pub fn prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Which files a rule claims: one glob or any of several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchConfig {
    /// A single glob pattern
    One(String),
    /// Any of several glob patterns
    Many(Vec<String>),
}

impl MatchConfig {
    /// All patterns in declaration order
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::One(p) => vec![p.as_str()],
            Self::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

/// Built-in path maps selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinPath {
    /// Output path equals input path
    #[default]
    Mirror,
    /// Replace all extensions with `.html`
    Html,
    /// `about.html` becomes `about/index.html`
    NiceUrl,
    /// Strip every extension
    RemoveExtensions,
    /// Keep only the last extension
    RemoveInternalExtensions,
}

/// How a rule maps an input path to its output path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathConfig {
    /// One of the built-in path maps
    Builtin(BuiltinPath),
    /// Replace all extensions with the given one
    ReplaceExtensions {
        /// New extension, with or without the leading dot
        replace_extensions: String,
    },
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::Builtin(BuiltinPath::Mirror)
    }
}

/// What a rule does with a matched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionConfig {
    /// Copy the file unchanged
    Copy,
    /// Claim the file and do nothing with it
    Ignore,
    /// Render the file as a template
    Render,
    /// Render the file as a template, then convert markdown to HTML
    Markdown,
}

/// One entry of the `[[rules]]` table
///
/// ```toml
/// [[rules]]
/// match = ["*.md", "*.markdown"]
/// path = "html"
/// action = "markdown"
/// kind = "post"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Glob pattern(s) claiming files
    #[serde(rename = "match")]
    pub matcher: MatchConfig,

    /// Path map
    #[serde(default)]
    pub path: PathConfig,

    /// File action
    pub action: ActionConfig,

    /// Page kind reported to listeners by render actions
    #[serde(default)]
    pub kind: Option<String>,

    /// Read a leading `+++` TOML table of render actions as page data
    #[serde(default)]
    pub front_matter: bool,
}

/// One entry of the `[[listeners]]` table: a page index listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Listener name; its state appears under `listeners.<name>`
    pub name: String,

    /// Only collect pages of this kind (all pages when absent)
    #[serde(default)]
    pub kind: Option<String>,

    /// Sort collected pages by this key
    #[serde(default)]
    pub sort_by: Option<String>,

    /// Reverse the order after sorting
    #[serde(default)]
    pub reverse: bool,
}

/// jssg configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Site section
    #[serde(default)]
    pub site: SiteConfig,

    /// Environment-level user context
    #[serde(default)]
    pub context: IndexMap<String, serde_json::Value>,

    /// Render-context defaults, exposed to templates as `render`
    #[serde(default)]
    pub render: IndexMap<String, serde_json::Value>,

    /// Build rules in declaration order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Page index listeners
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,

    /// Base directory for resolving relative paths (not serialized)
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    ///
    /// Relative paths in the file are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or TOML parsing fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            jssg_core::Error::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::from_toml_str(&content, &base_dir)
    }

    /// Load configuration from a TOML string, resolving paths against `base_dir`
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails
    pub fn from_toml_str(toml_content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_content)
            .map_err(|e| jssg_core::Error::Config(format!("Failed to parse config TOML: {e}")))?;

        config.resolve_relative_paths(base_dir);

        Ok(config)
    }

    /// Directory the configuration was resolved against
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve relative paths in configuration
    ///
    /// Expands `~/` to the home directory, then joins relative paths onto
    /// `base_dir`.
    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        self.base_dir = Some(base_dir.to_path_buf());

        self.site.source = Self::resolve_path(&self.site.source, base_dir);
        self.site.build = Self::resolve_path(&self.site.build, base_dir);
        self.site.templates = self
            .site
            .templates
            .iter()
            .map(|p| Self::resolve_path(p, base_dir))
            .collect();
        for dir in &mut self.site.prefixed_templates {
            // Fix the prefix before the path becomes absolute
            dir.prefix = Some(dir.prefix());
            dir.path = Self::resolve_path(&dir.path, base_dir);
        }
        if let Some(ref data) = self.site.data {
            self.site.data = Some(Self::resolve_path(data, base_dir));
        }
    }

    /// Resolve a single path: expand ~/ and resolve relative paths
    fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();

        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = ::dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~"
            && let Some(home) = ::dirs::home_dir()
        {
            return home;
        }

        if path.is_relative() {
            base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Source directory
    pub fn source_dir(&self) -> &Path {
        &self.site.source
    }

    /// Build directory
    pub fn build_dir(&self) -> &Path {
        &self.site.build
    }

    /// Environment-level user context: data files first, `[context]` on top
    ///
    /// # Errors
    ///
    /// Returns error if a data file cannot be read or parsed
    pub fn user_context(&self) -> Result<IndexMap<String, serde_json::Value>> {
        let mut context = match &self.site.data {
            Some(dir) => load_data_dir(dir)?,
            None => IndexMap::new(),
        };
        merge_variables(&mut context, self.context.clone());
        Ok(context)
    }
}
