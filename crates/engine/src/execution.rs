//! Execution rules
//!
//! An execution rule is called once per file during collection. It returns
//! the deferred work for that file and, optionally, state that listeners
//! receive before anything is executed:
//!
//! ```text
//! collect(ctx, input, output) -> (execution, state)
//! execution(ctx with listener state) -> optional extra state
//! ```
//!
//! Implement [`ExecutionRule`] to accumulate cross-file data, such as the
//! titles of every post for an index page.

use crate::context::{Context, RESERVED_KEYS};
use crate::error::{Error, Result};
use crate::filemap::FileMap;
use crate::frontmatter;
use jssg_core::path::RelPath;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Deferred per-file work, run during execution with the full context
pub type Execution = Box<dyn FnOnce(&Context) -> Result<Option<Value>>>;

/// Produces the deferred execution and optional state for one file
pub trait ExecutionRule {
    /// Collect one file
    ///
    /// `ctx` is the collection-time context; `ctx.fs()` is the filesystem
    /// handle. Listener state is not available yet.
    ///
    /// # Errors
    ///
    /// Any error aborts the build before anything is written
    fn collect(
        &self,
        ctx: &Context,
        input: &RelPath,
        output: &RelPath,
    ) -> Result<(Execution, Option<Value>)>;
}

/// Wraps a [`FileMap`]: runs it during execution, returns no state
#[derive(Debug, Clone)]
pub struct FileMapRule(FileMap);

impl FileMapRule {
    /// Wrap a file map
    pub fn new(file_map: FileMap) -> Self {
        Self(file_map)
    }
}

impl ExecutionRule for FileMapRule {
    fn collect(
        &self,
        _ctx: &Context,
        input: &RelPath,
        output: &RelPath,
    ) -> Result<(Execution, Option<Value>)> {
        let file_map = self.0.clone();
        let input = input.clone();
        let output = output.clone();
        let execution: Execution = Box::new(move |ctx| {
            file_map.apply(ctx, &input, &output)?;
            Ok(None)
        });
        Ok((execution, None))
    }
}

/// Per-file template values for one `(input, output)` pair
pub type ContextHook = dyn Fn(&Context, &RelPath, &RelPath) -> Result<Map<String, Value>>;

/// Builds the state a [`RenderRule`] reports for one file from its page data
pub type StateFn =
    dyn Fn(&Context, &RelPath, &RelPath, &Map<String, Value>) -> Result<Option<Value>>;

/// Renders the input as a template and writes the result
///
/// The template sees the whole execution context, the file's page data,
/// `href` (the output path, `/`-separated), `fullhref` (`baseUrl` + `href`)
/// and a `push_to_collection(page)` function. Pushed pages get the same
/// `href` and `fullhref` and land in `pages` for every later execution.
///
/// Page data is gathered during collection: the front matter table (when
/// enabled), then each hook in order, later keys winning. Reserved context
/// keys are never overridden.
///
/// A named rule reports each page to listeners as its page data plus
/// `{"type", "input", "output", "href", "fullhref"}`, unless
/// [`with_state`](Self::with_state) replaces that.
#[derive(Clone, Default)]
pub struct RenderRule {
    name: Option<String>,
    markdown: bool,
    front_matter: bool,
    hooks: Vec<Arc<ContextHook>>,
    state: Option<Arc<StateFn>>,
}

impl RenderRule {
    /// Render without reporting state
    pub fn new() -> Self {
        Self::default()
    }

    /// Render and report pages of kind `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Convert the rendered text from markdown to HTML
    #[must_use]
    pub fn markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    /// Read a leading `+++` TOML table as page data and strip it
    #[must_use]
    pub fn front_matter(mut self, front_matter: bool) -> Self {
        self.front_matter = front_matter;
        self
    }

    /// Add a per-file context hook
    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context, &RelPath, &RelPath) -> Result<Map<String, Value>> + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Replace the reported state
    ///
    /// Called for every file, named or not; `None` reports nothing.
    #[must_use]
    pub fn with_state<F>(mut self, state: F) -> Self
    where
        F: Fn(&Context, &RelPath, &RelPath, &Map<String, Value>) -> Result<Option<Value>>
            + 'static,
    {
        self.state = Some(Arc::new(state));
        self
    }

    /// Kind reported to listeners, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn page_data(
        &self,
        ctx: &Context,
        input: &RelPath,
        output: &RelPath,
    ) -> Result<(Map<String, Value>, Option<String>)> {
        let (mut page, template) = if self.front_matter {
            let source = ctx.fs().read_to_string(input)?;
            let (page, body) = frontmatter::parse(input, &source)?;
            (page, Some(body))
        } else {
            (Map::new(), None)
        };

        for hook in &self.hooks {
            page.extend(hook(ctx, input, output)?);
        }
        Ok((page, template))
    }

    fn report(
        &self,
        ctx: &Context,
        input: &RelPath,
        output: &RelPath,
        page: &Map<String, Value>,
        links: &Links,
    ) -> Result<Option<Value>> {
        if let Some(state) = &self.state {
            return state(ctx, input, output, page);
        }

        Ok(self.name.as_ref().map(|name| {
            let mut state = page.clone();
            state.insert("type".to_string(), Value::String(name.clone()));
            state.insert("input".to_string(), input.to_slash_string().into());
            state.insert("output".to_string(), output.to_slash_string().into());
            links.insert_into(&mut state);
            Value::Object(state)
        }))
    }
}

impl fmt::Debug for RenderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRule")
            .field("name", &self.name)
            .field("markdown", &self.markdown)
            .field("front_matter", &self.front_matter)
            .field("hooks", &self.hooks.len())
            .field("custom_state", &self.state.is_some())
            .finish()
    }
}

/// `href` and `fullhref` of one output
#[derive(Debug, Clone)]
struct Links {
    href: String,
    fullhref: String,
}

impl Links {
    fn new(ctx: &Context, output: &RelPath) -> Self {
        let href = output.to_slash_string();
        let fullhref = format!("{}{}", ctx.base_url(), href);
        Self { href, fullhref }
    }

    fn insert_into(&self, map: &mut Map<String, Value>) {
        map.insert("href".to_string(), Value::String(self.href.clone()));
        map.insert("fullhref".to_string(), Value::String(self.fullhref.clone()));
    }
}

impl ExecutionRule for RenderRule {
    fn collect(
        &self,
        ctx: &Context,
        input: &RelPath,
        output: &RelPath,
    ) -> Result<(Execution, Option<Value>)> {
        let renderer = Arc::clone(ctx.renderer().ok_or_else(|| {
            Error::configuration(format!("no template renderer configured to render {input}"))
        })?);

        let links = Links::new(ctx, output);
        let (page, template) = self.page_data(ctx, input, output)?;
        let state = self.report(ctx, input, output, &page, &links)?;

        let markdown = self.markdown;
        let input = input.clone();
        let output = output.clone();
        let execution: Execution = Box::new(move |ctx| {
            let template = match template {
                Some(template) => template,
                None => ctx.fs().read_to_string(&input)?,
            };
            let name = input.to_slash_string();

            let mut values = ctx.to_value();
            if let Value::Object(map) = &mut values {
                for (key, value) in page {
                    if !RESERVED_KEYS.contains(&key.as_str()) {
                        map.insert(key, value);
                    }
                }
                links.insert_into(map);
            }

            let (mut rendered, pushed) = renderer.render_collecting(&name, &template, &values)?;
            for page in pushed {
                let Value::Object(mut page) = page else {
                    return Err(Error::Render {
                        name,
                        message: "push_to_collection expects a mapping".to_string(),
                    });
                };
                links.insert_into(&mut page);
                ctx.pages().push(Value::Object(page));
            }

            if markdown {
                rendered = renderer.render_markdown(&rendered)?;
            }

            ctx.fs().write(&output, rendered.as_bytes())?;
            Ok(None)
        });

        Ok((execution, state))
    }
}
