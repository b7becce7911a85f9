//! Build listeners
//!
//! Listeners aggregate state across files. During a build each listener:
//!
//! 1. receives every state returned while files were collected
//!    ([`BuildListener::on_data_return`])
//! 2. contributes one value to the execution context
//!    ([`BuildListener::before_execute`]), visible as `listeners.<name>`
//! 3. receives any state returned by executions, right after each one runs

use crate::context::Context;
use crate::error::Result;
use jssg_config::ListenerConfig;
use jssg_core::path::RelPath;
use serde_json::Value;
use std::cmp::Ordering;

/// State reported for one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileState {
    /// Source-relative input path
    pub input: RelPath,
    /// Build-relative output path
    pub output: RelPath,
    /// Opaque state value
    pub data: Value,
}

/// A named hook into the build
pub trait BuildListener {
    /// Unique name; the listener's value appears under `listeners.<name>`
    fn name(&self) -> &str;

    /// Called once at the start of every build
    fn on_build_start(&mut self) {}

    /// Called once per build, after collection, before any execution
    ///
    /// # Errors
    ///
    /// Any error aborts the build before anything is written
    fn before_execute(&mut self, _ctx: &Context) -> Result<Value> {
        Ok(Value::Null)
    }

    /// Called once for every non-absent state
    ///
    /// # Errors
    ///
    /// Any error aborts the build
    fn on_data_return(&mut self, _state: &FileState) -> Result<()> {
        Ok(())
    }
}

/// Collects page states into a list
///
/// ```
/// use jssg_engine::listener::PageIndex;
///
/// let posts = PageIndex::new("posts").kind("post").sort_by("href").reversed(true);
/// ```
#[derive(Debug, Clone)]
pub struct PageIndex {
    name: String,
    kind: Option<String>,
    sort_by: Option<String>,
    reverse: bool,
    pages: Vec<Value>,
}

impl PageIndex {
    /// Collect every state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            sort_by: None,
            reverse: false,
            pages: Vec::new(),
        }
    }

    /// Only collect states whose `type` equals `kind`
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sort collected pages by the value under `key`
    #[must_use]
    pub fn sort_by(mut self, key: impl Into<String>) -> Self {
        self.sort_by = Some(key.into());
        self
    }

    /// Reverse the final order
    #[must_use]
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Build from a `[[listeners]]` table entry
    pub fn from_config(config: &ListenerConfig) -> Self {
        let mut index = Self::new(config.name.clone()).reversed(config.reverse);
        index.kind.clone_from(&config.kind);
        index.sort_by.clone_from(&config.sort_by);
        index
    }

    fn accepts(&self, data: &Value) -> bool {
        match &self.kind {
            Some(kind) => data.get("type").and_then(Value::as_str) == Some(kind.as_str()),
            None => true,
        }
    }
}

impl BuildListener for PageIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_build_start(&mut self) {
        self.pages.clear();
    }

    fn before_execute(&mut self, _ctx: &Context) -> Result<Value> {
        let mut pages = self.pages.clone();
        if let Some(key) = &self.sort_by {
            pages.sort_by(|a, b| compare_values(&a[key.as_str()], &b[key.as_str()]));
        }
        if self.reverse {
            pages.reverse();
        }
        Ok(Value::Array(pages))
    }

    fn on_data_return(&mut self, state: &FileState) -> Result<()> {
        if self.accepts(&state.data) {
            self.pages.push(state.data.clone());
        }
        Ok(())
    }
}

/// Total order over JSON values used for sorting pages
///
/// Missing values sort first, then booleans, numbers, strings; values of
/// other types compare equal so the sort keeps their collection order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
