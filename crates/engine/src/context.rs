//! Layered build context
//!
//! The context every matcher, path map and execution sees is assembled from
//! three layers, later layers winning:
//!
//! 1. the environment-level user context (config `[context]` and data files)
//! 2. the per-build context passed with a [`BuildRequest`](crate::BuildRequest)
//! 3. keys reserved by the engine: `indir`, `outdir`, `baseUrl`, `render`,
//!    `pages` and, during execution only, `listeners`
//!
//! Handles that cannot be serialized (the filesystem and the template
//! renderer) are accessors on [`Context`], never map entries.

use crate::system::FileSystem;
use indexmap::IndexMap;
use jssg_core::TemplateRenderer;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Keys owned by the engine; user layers can never override them
pub const RESERVED_KEYS: &[&str] = &["indir", "outdir", "baseUrl", "render", "pages", "listeners"];

/// Shared, append-only list of page records
///
/// Cloning yields another handle to the same list, so pages pushed by one
/// execution are visible to every later one.
#[derive(Debug, Clone, Default)]
pub struct PageCollection(Rc<RefCell<Vec<Value>>>);

impl PageCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page record
    pub fn push(&self, page: Value) {
        self.0.borrow_mut().push(page);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Number of pages collected so far
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether no page has been collected yet
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// The context handed to every rule callable
#[derive(Clone)]
pub struct Context {
    values: Map<String, Value>,
    base_url: String,
    fs: Arc<dyn FileSystem>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    pages: PageCollection,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values)
            .field("base_url", &self.base_url)
            .field("renderer", &self.renderer.is_some())
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Start building a context around a filesystem handle
    pub fn builder(fs: Arc<dyn FileSystem>) -> ContextBuilder {
        ContextBuilder {
            fs,
            renderer: None,
            base_url: String::new(),
            render: IndexMap::new(),
            user: IndexMap::new(),
            call: IndexMap::new(),
            pages: PageCollection::new(),
        }
    }

    /// Look up a key
    ///
    /// `pages` is not stored as an entry; use [`Context::pages`] or
    /// [`Context::to_value`] for it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Public base URL of the site
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Filesystem handle
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Template renderer, if one was configured
    pub fn renderer(&self) -> Option<&Arc<dyn TemplateRenderer>> {
        self.renderer.as_ref()
    }

    /// Shared page collection
    pub fn pages(&self) -> &PageCollection {
        &self.pages
    }

    /// Name-keyed listener state, present during execution only
    pub fn listeners(&self) -> Option<&Value> {
        self.values.get("listeners")
    }

    /// The whole context as a JSON object, with a fresh `pages` snapshot
    pub fn to_value(&self) -> Value {
        let mut values = self.values.clone();
        values.insert("pages".to_string(), Value::Array(self.pages.snapshot()));
        Value::Object(values)
    }

    /// Copy of this context with the listener state installed
    pub(crate) fn with_listeners(&self, listeners: &IndexMap<String, Value>) -> Self {
        let mut ctx = self.clone();
        let state: Map<String, Value> = listeners
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ctx.values
            .insert("listeners".to_string(), Value::Object(state));
        ctx
    }
}

/// Builder for [`Context`]
pub struct ContextBuilder {
    fs: Arc<dyn FileSystem>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    base_url: String,
    render: IndexMap<String, Value>,
    user: IndexMap<String, Value>,
    call: IndexMap<String, Value>,
    pages: PageCollection,
}

impl ContextBuilder {
    /// Public base URL, exposed as `baseUrl`
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Template renderer handle
    #[must_use]
    pub fn renderer(mut self, renderer: Option<Arc<dyn TemplateRenderer>>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Render-context defaults, exposed as `render`
    #[must_use]
    pub fn render_defaults(mut self, render: IndexMap<String, Value>) -> Self {
        self.render = render;
        self
    }

    /// Environment-level user layer
    #[must_use]
    pub fn user(mut self, user: IndexMap<String, Value>) -> Self {
        self.user = user;
        self
    }

    /// Per-build layer
    #[must_use]
    pub fn call(mut self, call: IndexMap<String, Value>) -> Self {
        self.call = call;
        self
    }

    /// Page collection exposed as `pages`
    #[must_use]
    pub fn pages(mut self, pages: PageCollection) -> Self {
        self.pages = pages;
        self
    }

    /// Merge the layers
    pub fn build(self) -> Context {
        let mut values = Map::new();

        for (key, value) in self.user {
            values.insert(key, value);
        }

        for (key, value) in self.call {
            if values.contains_key(&key) {
                tracing::debug!(key = %key, "Build context overrides user context");
            }
            values.insert(key, value);
        }

        for key in RESERVED_KEYS {
            if values.remove(*key).is_some() {
                tracing::warn!(key = %key, "User context key is reserved by the engine and was ignored");
            }
        }

        values.insert(
            "indir".to_string(),
            Value::String(self.fs.source_root().to_string()),
        );
        values.insert(
            "outdir".to_string(),
            Value::String(self.fs.build_root().to_string()),
        );
        values.insert("baseUrl".to_string(), Value::String(self.base_url.clone()));
        values.insert(
            "render".to_string(),
            Value::Object(self.render.into_iter().collect()),
        );

        Context {
            values,
            base_url: self.base_url,
            fs: self.fs,
            renderer: self.renderer,
            pages: self.pages,
        }
    }
}
