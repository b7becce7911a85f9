//! Common utilities and types shared across CLI commands

use crate::error::{CommandError, Result};
use jssg_config::{CONFIG_FILE_NAME, Config};
use jssg_engine::{BuildRule, PageIndex, RelPath, SiteSettings};
use jssg_template::TemplateEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line values that take precedence over `jssg.toml`
#[derive(Debug, Clone, Default)]
pub struct SiteOverrides {
    /// Source directory
    pub source: Option<PathBuf>,
    /// Build directory
    pub build: Option<PathBuf>,
    /// Public base URL
    pub base_url: Option<String>,
}

/// Runtime context for CLI commands
///
/// Holds the loaded configuration and the directories every command works
/// on, after command-line overrides have been applied.
///
/// ```no_run
/// use jssg::common::{RuntimeContext, SiteOverrides};
/// use std::path::Path;
///
/// let context = RuntimeContext::load(Path::new("jssg.toml"), false, SiteOverrides::default())?;
/// println!("building {} into {}", context.source_dir().display(), context.build_dir().display());
/// # Ok::<(), jssg::error::CommandError>(())
/// ```
#[derive(Clone)]
pub struct RuntimeContext {
    /// Shared configuration
    pub config: Arc<Config>,
    /// Configuration file path
    pub config_path: PathBuf,
    /// Whether the configuration file was found
    pub config_found: bool,
    source_dir: PathBuf,
    build_dir: PathBuf,
    base_url: String,
}

impl RuntimeContext {
    /// Load the configuration file and apply overrides
    ///
    /// A missing file is an error only when it was asked for explicitly;
    /// otherwise the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(config_path: &Path, explicit: bool, overrides: SiteOverrides) -> Result<Self> {
        let found = config_path.is_file();
        let config = if found {
            Config::load(config_path)?
        } else if explicit {
            return Err(CommandError::config(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", config_path.display()),
            )));
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "No configuration file, using defaults"
            );
            Config::default()
        };

        Ok(Self::new(config, config_path.to_path_buf(), found, overrides))
    }

    /// Create a context from an already-loaded configuration
    pub fn new(
        config: Config,
        config_path: PathBuf,
        config_found: bool,
        overrides: SiteOverrides,
    ) -> Self {
        let source_dir = overrides
            .source
            .unwrap_or_else(|| config.source_dir().to_path_buf());
        let build_dir = overrides
            .build
            .unwrap_or_else(|| config.build_dir().to_path_buf());
        let base_url = overrides
            .base_url
            .unwrap_or_else(|| config.site.base_url.clone());

        Self {
            config: Arc::new(config),
            config_path,
            config_found,
            source_dir,
            build_dir,
            base_url,
        }
    }

    /// Source directory
    #[inline]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Build directory
    #[inline]
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Public base URL
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Template engine over the configured search paths
    pub fn template_engine(&self) -> TemplateEngine {
        let prefixed = self
            .config
            .site
            .prefixed_templates
            .iter()
            .map(|dir| (dir.path.clone(), dir.prefix()))
            .collect();
        TemplateEngine::with_search_paths(self.config.site.templates.clone(), prefixed)
    }

    /// Engine rules built from the `[[rules]]` table
    ///
    /// # Errors
    ///
    /// Returns an error naming the first malformed rule
    pub fn rules(&self) -> Result<Vec<BuildRule>> {
        Ok(BuildRule::from_configs(&self.config.rules)?)
    }

    /// Site settings for a build environment, listeners included
    ///
    /// # Errors
    ///
    /// Returns an error if a data file cannot be loaded
    pub fn site_settings(&self) -> Result<SiteSettings> {
        let mut settings = SiteSettings::new(&self.source_dir, &self.build_dir, &self.base_url)
            .with_user_context(self.config.user_context()?)
            .with_render_defaults(self.config.render.clone())
            .with_renderer(Arc::new(self.template_engine()));

        for listener in &self.config.listeners {
            settings = settings.with_listener(PageIndex::from_config(listener));
        }

        Ok(settings)
    }
}

/// Default configuration file location
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Parse a subdirectory argument relative to the source directory
///
/// Accepts `/`-separated paths; absolute paths and `..` are rejected.
///
/// # Errors
///
/// Returns `InvalidSubdir` for paths outside the source tree
pub fn parse_subdir(subdir: &str) -> Result<RelPath> {
    let invalid = |reason: &str| CommandError::InvalidSubdir {
        path: subdir.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = subdir.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("empty path"));
    }
    RelPath::parse(trimmed).map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_take_precedence() {
        let config = Config::from_toml_str(
            "[site]\nsource = \"content\"\nbase_url = \"https://a.example/\"\n",
            Path::new("/site"),
        )
        .unwrap();
        let overrides = SiteOverrides {
            build: Some(PathBuf::from("/tmp/out")),
            base_url: Some("https://b.example/".to_string()),
            ..SiteOverrides::default()
        };

        let context = RuntimeContext::new(config, default_config_path(), true, overrides);
        assert_eq!(context.source_dir(), Path::new("/site/content"));
        assert_eq!(context.build_dir(), Path::new("/tmp/out"));
        assert_eq!(context.base_url(), "https://b.example/");
    }

    #[test]
    fn test_missing_default_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);

        let context = RuntimeContext::load(&path, false, SiteOverrides::default()).unwrap();
        assert!(!context.config_found);
        assert_eq!(context.base_url(), "/");
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.toml");

        let result = RuntimeContext::load(&path, true, SiteOverrides::default());
        assert!(matches!(result, Err(CommandError::ConfigError(_))));
    }

    #[test]
    fn test_load_resolves_against_config_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[site]\nsource = \"pages\"\n").unwrap();

        let context = RuntimeContext::load(&path, true, SiteOverrides::default()).unwrap();
        assert!(context.config_found);
        assert_eq!(context.source_dir(), temp.path().join("pages"));
    }

    #[test]
    fn test_parse_subdir() {
        assert_eq!(parse_subdir("posts/").unwrap().to_slash_string(), "posts");
        assert_eq!(parse_subdir("a/b").unwrap().to_slash_string(), "a/b");
        assert!(parse_subdir("../x").is_err());
        assert!(parse_subdir("posts/../../x").is_err());
        assert!(parse_subdir("/abs").is_err());
        assert!(parse_subdir("").is_err());
    }
}
