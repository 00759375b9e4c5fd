//! Render context and document rendering

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use sheetdoc_agents::template_engine;
use sheetdoc_core::ExtractedNamespace;

use crate::error::RenderError;

/// Merges the namespace and generated paragraph text
///
/// Sheet entries come first; generated text is layered on top, so a
/// paragraph id equal to a sheet name replaces that sheet's values.
#[derive(Debug, Clone, Default)]
pub struct RenderContextBuilder {
    context: Map<String, Value>,
}

impl RenderContextBuilder {
    /// Start from the namespace
    #[must_use]
    pub fn new(namespace: &ExtractedNamespace) -> Self {
        Self {
            context: namespace.clone().into_map(),
        }
    }

    /// Add generated paragraph text
    #[must_use]
    pub fn with_paragraphs(mut self, generated: &IndexMap<String, String>) -> Self {
        for (id, text) in generated {
            self.context.insert(id.clone(), Value::String(text.clone()));
        }
        self
    }

    /// Expose `text` under an extra key
    #[must_use]
    pub fn with_alias(mut self, alias: &str, text: &str) -> Self {
        self.context
            .insert(alias.to_string(), Value::String(text.to_string()));
        self
    }

    /// Finished context
    #[must_use]
    pub fn build(self) -> Map<String, Value> {
        self.context
    }
}

/// Turns a template plus context into a saved document
pub trait DocumentRenderer: Send + Sync {
    /// Render `template` with `context` into `output`, returning the path written
    ///
    /// # Errors
    /// [`RenderError`] on template, render or write failure.
    fn render(
        &self,
        template: &Path,
        context: &Map<String, Value>,
        output: &Path,
    ) -> Result<PathBuf, RenderError>;
}

/// Renders text templates with Handlebars
///
/// Missing keys render empty and nothing is HTML-escaped, so Markdown and
/// plain-text templates come out as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlebarsRenderer;

impl HandlebarsRenderer {
    /// Create a renderer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for HandlebarsRenderer {
    fn render(
        &self,
        template: &Path,
        context: &Map<String, Value>,
        output: &Path,
    ) -> Result<PathBuf, RenderError> {
        let source = fs::read_to_string(template).map_err(|source| RenderError::Template {
            path: template.to_path_buf(),
            source,
        })?;
        let text = template_engine()
            .render_template(&source, context)
            .map_err(|e| RenderError::Render {
                path: template.to_path_buf(),
                message: e.to_string(),
            })?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(output, text).map_err(|source| RenderError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!(output = %output.display(), "document rendered");
        Ok(output.to_path_buf())
    }
}
