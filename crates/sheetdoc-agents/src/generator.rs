//! Paragraph generation agents

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::Result;
use crate::llm::CompletionService;
use crate::prompt::PromptTemplate;

/// Everything a generator is built from
#[derive(Clone)]
pub struct GeneratorInit {
    /// Paragraph id, for logs
    pub paragraph: String,
    /// Resolved prompt file
    pub prompt_path: PathBuf,
    /// Nested context the prompt renders against
    pub context: Map<String, Value>,
    /// Completion service for the task's provider
    pub service: Arc<dyn CompletionService>,
}

impl fmt::Debug for GeneratorInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorInit")
            .field("paragraph", &self.paragraph)
            .field("prompt_path", &self.prompt_path)
            .field("context_keys", &self.context.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Produces narrative text for one paragraph
#[async_trait]
pub trait Generator: Send + Sync {
    /// Agent name
    fn name(&self) -> &str;

    /// Generate trimmed text
    async fn generate(&self) -> Result<String>;
}

/// Default generator: the rendered prompt as a single system message
#[derive(Debug)]
pub struct GenericParagraphGenerator {
    init: GeneratorInit,
}

impl GenericParagraphGenerator {
    /// Registry name
    pub const NAME: &'static str = "GenericParagraphGenerator";

    /// Create from init
    #[must_use]
    pub fn new(init: GeneratorInit) -> Self {
        Self { init }
    }

    /// Render the prompt; the context is visible at top level and under `data`
    ///
    /// # Errors
    /// Prompt read and template errors.
    pub fn render_prompt(&self) -> Result<String> {
        let prompt = PromptTemplate::load(&self.init.prompt_path)?;
        let mut data = self.init.context.clone();
        data.insert("data".to_string(), Value::Object(self.init.context.clone()));
        prompt.render(&data)
    }
}

#[async_trait]
impl Generator for GenericParagraphGenerator {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self), fields(paragraph = %self.init.paragraph))]
    async fn generate(&self) -> Result<String> {
        let system_prompt = self.render_prompt()?;
        let text = self.init.service.complete_text(&system_prompt).await?;
        Ok(text.trim().to_string())
    }
}
