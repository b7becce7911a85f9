//! Template engine implementation
//!
//! The engine wraps minijinja and provides template rendering with the site
//! filters and a directory-backed loader.

use crate::filters;
use crate::{Error, Result};
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Template function that appends a page to the build's page collection
pub const PUSH_FUNCTION: &str = "push_to_collection";

/// Template engine for rendering templates
pub struct TemplateEngine {
    /// The minijinja environment
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a template engine without a loader
    ///
    /// Only inline templates can be rendered; `extends` and `include` fail.
    #[must_use]
    pub fn new() -> Self {
        Self::with_search_paths(Vec::new(), Vec::new())
    }

    /// Create a template engine that loads templates from directories
    ///
    /// When a template such as `{% extends "base.html" %}` is requested, the
    /// engine searches:
    /// 1. every directory in `search_paths`, in order, for `base.html`
    /// 2. every `(dir, prefix)` pair in `prefixed`, where the name must start
    ///    with `prefix/` and the rest is looked up under `dir`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jssg_template::TemplateEngine;
    /// use std::path::PathBuf;
    ///
    /// let engine = TemplateEngine::with_search_paths(
    ///     vec![PathBuf::from("templates")],
    ///     vec![(PathBuf::from("layouts"), "x".to_string())],
    /// );
    /// // "x/post.html" now resolves to layouts/post.html
    /// ```
    #[must_use]
    pub fn with_search_paths(search_paths: Vec<PathBuf>, prefixed: Vec<(PathBuf, String)>) -> Self {
        let mut env = Environment::new();

        // Referencing a missing variable is an error, not an empty string
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        // trim_blocks: automatically remove newlines after block tags
        // lstrip_blocks: automatically strip leading whitespace from block lines
        // keep_trailing_newline: ensure files always end with a newline
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        // Source pages are HTML already; output is never escaped
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_filter("markdown", filters::markdown);
        env.add_filter("parse_date", filters::parse_date);
        env.add_filter("format_date", filters::format_date);
        env.add_filter("rfc2822_date", filters::rfc2822_date);
        env.add_filter("rss_format_date", filters::rfc2822_date);

        if !search_paths.is_empty() || !prefixed.is_empty() {
            env.set_loader(move |name| {
                // Never step outside the template directories
                if name.split('/').any(|part| part == "..") {
                    return Ok(None);
                }

                for dir in &search_paths {
                    let path = dir.join(name);
                    if path.is_file() {
                        return read_template(name, &path).map(Some);
                    }
                }

                for (dir, prefix) in &prefixed {
                    let rest = name
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_prefix('/'));
                    if let Some(rest) = rest {
                        let path = dir.join(rest);
                        if path.is_file() {
                            return read_template(name, &path).map(Some);
                        }
                    }
                }

                // Template not found
                Ok(None)
            });
        }

        Self { env }
    }

    /// Render a template string with the given context
    ///
    /// # Examples
    ///
    /// ```
    /// use jssg_template::TemplateEngine;
    ///
    /// let engine = TemplateEngine::new();
    /// let context = serde_json::json!({ "name": "Alice" });
    ///
    /// let result = engine.render_str("Hello {{ name }}!", &context).unwrap();
    /// assert_eq!(result, "Hello Alice!");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error if template rendering fails
    pub fn render_str(&self, template: &str, context: &serde_json::Value) -> Result<String> {
        self.env.render_str(template, context).map_err(Error::from)
    }

    /// Render a template string with a specific name for better error messages
    ///
    /// Output is never auto-escaped, whatever the name's extension.
    ///
    /// # Errors
    ///
    /// Returns error if template rendering fails
    pub fn render_named_str(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String> {
        self.env
            .render_named_str(name, template, context)
            .map_err(Error::from)
    }

    /// Render a template found by the loader
    ///
    /// # Errors
    ///
    /// Returns error if the template cannot be found or rendering fails
    pub fn render_template(&self, name: &str, context: &serde_json::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template.render(context).map_err(Error::from)
    }

    /// Render a template string that may push pages
    ///
    /// The template sees `context` plus a `push_to_collection(page)` function.
    /// Pushed pages are returned in push order; the call itself renders as an
    /// empty string.
    ///
    /// # Errors
    ///
    /// Returns error if template rendering fails or a pushed value cannot be
    /// converted to JSON
    pub fn render_collecting(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<(String, Vec<serde_json::Value>)> {
        let pushed: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let sink = Arc::clone(&pushed);

        let push = minijinja::Value::from_function(
            move |page: minijinja::Value| -> std::result::Result<String, minijinja::Error> {
                let page = serde_json::to_value(&page).map_err(|e| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("{PUSH_FUNCTION}: page is not serializable: {e}"),
                    )
                })?;
                sink.lock()
                    .map_err(|_| {
                        minijinja::Error::new(
                            ErrorKind::InvalidOperation,
                            format!("{PUSH_FUNCTION}: page buffer poisoned"),
                        )
                    })?
                    .push(page);
                Ok(String::new())
            },
        );

        let ctx = minijinja::context! {
            push_to_collection => push,
            ..minijinja::Value::from_serialize(context)
        };
        let rendered = self.env.render_named_str(name, template, ctx)?;

        let pages = pushed
            .lock()
            .map(|mut pages| std::mem::take(&mut *pages))
            .map_err(|_| Error::Render {
                location: name.to_string(),
                message: format!("{PUSH_FUNCTION}: page buffer poisoned"),
            })?;

        Ok((rendered, pages))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn read_template(name: &str, path: &Path) -> std::result::Result<String, minijinja::Error> {
    std::fs::read_to_string(path).map_err(|e| {
        minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            format!("Failed to read template '{name}': {e}"),
        )
    })
}

fn render_error(name: &str, err: Error) -> jssg_core::Error {
    jssg_core::Error::Render {
        name: name.to_string(),
        message: err.to_string(),
    }
}

impl jssg_core::TemplateRenderer for TemplateEngine {
    fn render_named_str(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> jssg_core::Result<String> {
        self.env
            .render_named_str(name, template, context)
            .map_err(|e| render_error(name, Error::from(e)))
    }

    fn render_collecting(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> jssg_core::Result<(String, Vec<serde_json::Value>)> {
        TemplateEngine::render_collecting(self, name, template, context)
            .map_err(|e| render_error(name, e))
    }

    fn render_markdown(&self, markdown: &str) -> jssg_core::Result<String> {
        Ok(filters::markdown_to_html(markdown))
    }
}
