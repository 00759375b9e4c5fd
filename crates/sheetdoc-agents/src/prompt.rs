//! Handlebars prompt templates
//!
//! Prompts and documents share one engine setup: no HTML escaping, missing
//! keys render empty, plus a `json` helper for dumping structured values.

use std::fs;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{AgentError, Result};

/// Build a Handlebars engine configured for plain-text output
#[must_use]
pub fn template_engine() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(false);
    handlebars.register_helper("json", Box::new(json_helper));
    handlebars
}

fn json_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

/// A prompt loaded from disk
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    path: PathBuf,
    source: String,
}

impl PromptTemplate {
    /// Read a prompt file
    ///
    /// # Errors
    /// [`AgentError::Prompt`] when the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|source| AgentError::Prompt {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create from inline text
    #[must_use]
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from("<inline>"),
            source: source.into(),
        }
    }

    /// Where the prompt came from
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render against `data`
    ///
    /// # Errors
    /// [`AgentError::Template`] on template syntax or render errors.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        template_engine()
            .render_template(&self.source, data)
            .map_err(|e| AgentError::Template(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_without_escaping() {
        let prompt = PromptTemplate::inline("{{table}} / {{keys}}");
        let out = prompt
            .render(&json!({"table": "A,B\n<1>,&2\n", "keys": "x"}))
            .unwrap();
        assert_eq!(out, "A,B\n<1>,&2\n / x");
    }

    #[test]
    fn missing_key_renders_empty() {
        let out = PromptTemplate::inline("[{{nope}}]").render(&json!({})).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn json_helper_dumps_values() {
        let out = PromptTemplate::inline("{{json data.S}}")
            .render(&json!({"data": {"S": {"Rate": 0.5}}}))
            .unwrap();
        assert_eq!(out, r#"{"Rate":0.5}"#);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptTemplate::load(&dir.path().join("none.hbs")).unwrap_err();
        assert!(matches!(err, AgentError::Prompt { .. }));
    }

    #[test]
    fn syntax_error_is_template_error() {
        let err = PromptTemplate::inline("{{#if x}}unclosed").render(&json!({})).unwrap_err();
        assert!(matches!(err, AgentError::Template(_)));
    }
}
