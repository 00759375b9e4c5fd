//! Sheet extraction agents

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use sheetdoc_core::{FieldType, SheetTable};
use tracing::instrument;

use crate::error::Result;
use crate::llm::CompletionService;
use crate::prompt::PromptTemplate;
use crate::schema::ExtractionSchema;

/// Everything an extractor is built from
#[derive(Clone)]
pub struct ExtractorInit {
    /// Sheet contents
    pub table: SheetTable,
    /// Declared field name → type, in order
    pub fields: IndexMap<String, FieldType>,
    /// Resolved prompt file
    pub prompt_path: PathBuf,
    /// Completion service for the task's provider
    pub service: Arc<dyn CompletionService>,
}

impl fmt::Debug for ExtractorInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorInit")
            .field("sheet", &self.table.name)
            .field("fields", &self.fields)
            .field("prompt_path", &self.prompt_path)
            .field("provider", &self.service.provider())
            .finish()
    }
}

/// Produces raw field values for one sheet
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Agent name
    fn name(&self) -> &str;

    /// Extract `{field: raw}`; an empty map when the model produced nothing
    async fn extract(&self) -> Result<Map<String, Value>>;
}

/// Default extractor: one forced `extract` function call per sheet
#[derive(Debug)]
pub struct GenericExtractor {
    init: ExtractorInit,
}

impl GenericExtractor {
    /// Registry name
    pub const NAME: &'static str = "GenericExtractor";

    /// Create from init
    #[must_use]
    pub fn new(init: ExtractorInit) -> Self {
        Self { init }
    }

    /// Render the extraction prompt with `table` and `keys`
    ///
    /// # Errors
    /// Prompt read, table serialization and template errors.
    pub fn render_prompt(&self) -> Result<String> {
        let prompt = PromptTemplate::load(&self.init.prompt_path)?;
        let table = self.init.table.to_csv()?;
        let keys: Vec<&str> = self.init.fields.keys().map(String::as_str).collect();
        prompt.render(&json!({ "table": table, "keys": keys }))
    }
}

#[async_trait]
impl Extractor for GenericExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self), fields(sheet = %self.init.table.name))]
    async fn extract(&self) -> Result<Map<String, Value>> {
        let system_prompt = self.render_prompt()?;
        let schema = ExtractionSchema::new(&self.init.fields);
        let result = self
            .init
            .service
            .complete_structured(&system_prompt, &schema)
            .await?;
        if result.is_none() {
            tracing::debug!("model returned no structured result");
        }
        Ok(result.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::llm::MockCompletionService;
    use std::fs;

    fn init(service: MockCompletionService, dir: &tempfile::TempDir) -> ExtractorInit {
        let prompt_path = dir.path().join("extract.hbs");
        fs::write(&prompt_path, "Fields: {{#each keys}}{{this}};{{/each}}\n{{table}}").unwrap();
        let mut fields = IndexMap::new();
        fields.insert("Rate".to_string(), FieldType::Number);
        ExtractorInit {
            table: SheetTable::new(
                "Safety",
                vec!["Metric".into(), "Value".into()],
                vec![vec!["Rate".into(), "50%".into()]],
            ),
            fields,
            prompt_path,
            service: Arc::new(service),
        }
    }

    #[tokio::test]
    async fn extract_renders_prompt_and_returns_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = MockCompletionService::new();
        service
            .expect_complete_structured()
            .times(1)
            .returning(|prompt, schema| {
                assert_eq!(prompt.to_string(), "Fields: Rate;\nMetric,Value\nRate,50%\n");
                assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["Rate"]);
                let mut map = Map::new();
                map.insert("Rate".into(), json!("50%"));
                Ok(Some(map))
            });

        let extractor = GenericExtractor::new(init(service, &dir));
        let raw = extractor.extract().await.unwrap();
        assert_eq!(raw["Rate"], "50%");
    }

    #[tokio::test]
    async fn no_structured_result_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = MockCompletionService::new();
        service
            .expect_complete_structured()
            .returning(|_, _| Ok(None));

        let raw = GenericExtractor::new(init(service, &dir)).extract().await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn missing_prompt_fails_without_calling_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = MockCompletionService::new();
        service.expect_complete_structured().times(0);

        let mut init = init(service, &dir);
        init.prompt_path = dir.path().join("missing.hbs");
        let err = GenericExtractor::new(init).extract().await.unwrap_err();
        assert!(matches!(err, AgentError::Prompt { .. }));
    }
}
