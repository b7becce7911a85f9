//! Collaborator traits for jssg components
//!
//! The build engine renders templates through this interface instead of
//! depending on a concrete template engine. `jssg-template` provides the
//! minijinja-backed implementation; tests can plug in a trivial one.

use crate::Result;

/// Template renderer interface
///
/// Uses `serde_json::Value` for context to ensure trait object safety.
/// Any struct implementing `serde::Serialize` can be converted to `Value` with `serde_json::to_value()`.
///
/// # Examples
///
/// ```ignore
/// use jssg_core::TemplateRenderer;
///
/// fn render_greeting(renderer: &dyn TemplateRenderer) -> Result<String> {
///     let value = serde_json::json!({ "name": "Alice" });
///     renderer.render_named_str("greeting.txt", "Hello {{ name }}!", &value)
/// }
/// ```
pub trait TemplateRenderer {
    /// Render a template string with a name used in error messages
    ///
    /// # Arguments
    ///
    /// * `name` - Template name to use in error messages (e.g., the source path)
    /// * `template` - The template source code
    /// * `context` - Context data as a JSON value
    fn render_named_str(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String>;

    /// Render a template that may call `push_to_collection(page)`
    ///
    /// Returns the rendered text and every pushed page, in push order.
    /// Renderers without a push function report no pages.
    fn render_collecting(
        &self,
        name: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<(String, Vec<serde_json::Value>)> {
        Ok((self.render_named_str(name, template, context)?, Vec::new()))
    }

    /// Convert markdown text to HTML
    fn render_markdown(&self, markdown: &str) -> Result<String>;
}
