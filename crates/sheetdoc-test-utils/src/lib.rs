//! Testing utilities for sheetdoc workspace
//!
//! Shared fakes, fixtures, and builders.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sheetdoc_agents::{AgentError, CompletionService, ExtractionSchema, ProviderRegistry};
use sheetdoc_core::{FieldType, SheetTable, PARAGRAPH_TASKS_FILE, SHEET_TASKS_FILE};
use sheetdoc_pipeline::{DocumentRenderer, PipelineSettings, RenderError, Workbook, WorkbookError};
use tempfile::TempDir;

// ----------------------------------------------------------------------
// Builders
// ----------------------------------------------------------------------

pub fn table(name: &str, headers: &[&str], rows: &[&[&str]]) -> SheetTable {
    SheetTable::new(
        name,
        headers.iter().map(|h| (*h).to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect(),
    )
}

pub fn fields(declared: &[(&str, FieldType)]) -> IndexMap<String, FieldType> {
    declared
        .iter()
        .map(|(name, ty)| ((*name).to_string(), ty.clone()))
        .collect()
}

/// Object from a `json!` literal; panics on anything else
pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// ----------------------------------------------------------------------
// Workbook
// ----------------------------------------------------------------------

/// Sheets in insertion order; an unreadable sheet is listed but fails to load
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: IndexMap<String, Option<SheetTable>>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        self.sheets
            .insert(name.to_string(), Some(table(name, headers, rows)));
        self
    }

    pub fn with_unreadable(mut self, name: &str) -> Self {
        self.sheets.insert(name.to_string(), None);
        self
    }
}

impl Workbook for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    fn sheet(&self, name: &str) -> Result<SheetTable, WorkbookError> {
        match self.sheets.get(name) {
            Some(Some(table)) => Ok(table.clone()),
            Some(None) => Err(WorkbookError::Io {
                path: PathBuf::from(name),
                source: std::io::Error::other("unreadable sheet"),
            }),
            None => Err(WorkbookError::MissingSheet(name.to_string())),
        }
    }
}

// ----------------------------------------------------------------------
// Completion service
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Structured { prompt: String, fields: Vec<String> },
    Text { prompt: String },
}

/// Completion service answering from queues and recording every call
///
/// Empty queues answer "no structured result" and empty text.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    provider: String,
    structured: Mutex<VecDeque<Option<Map<String, Value>>>>,
    text: Mutex<VecDeque<String>>,
    failure: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCompletion {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    /// Every call fails with an API error
    pub fn failing(provider: &str, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(provider)
        }
    }

    pub fn with_structured(self, value: Value) -> Self {
        self.structured.lock().unwrap().push_back(Some(object(value)));
        self
    }

    pub fn with_no_structured(self) -> Self {
        self.structured.lock().unwrap().push_back(None);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.text.lock().unwrap().push_back(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn text_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Text { .. }))
            .count()
    }

    pub fn structured_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Structured { .. }))
            .count()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn check_failure(&self) -> sheetdoc_agents::Result<()> {
        match &self.failure {
            Some(message) => Err(AgentError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn complete_structured(
        &self,
        system_prompt: &str,
        schema: &ExtractionSchema,
    ) -> sheetdoc_agents::Result<Option<Map<String, Value>>> {
        self.calls.lock().unwrap().push(Call::Structured {
            prompt: system_prompt.to_string(),
            fields: schema.field_names().map(str::to_string).collect(),
        });
        self.check_failure()?;
        Ok(self.structured.lock().unwrap().pop_front().flatten())
    }

    async fn complete_text(&self, system_prompt: &str) -> sheetdoc_agents::Result<String> {
        self.calls.lock().unwrap().push(Call::Text {
            prompt: system_prompt.to_string(),
        });
        self.check_failure()?;
        Ok(self.text.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Registry with `service` registered under its provider id
pub fn providers_with(service: &Arc<ScriptedCompletion>) -> ProviderRegistry {
    let id = service.provider().to_string();
    ProviderRegistry::new().with(&id, Arc::clone(service) as Arc<dyn CompletionService>)
}

// ----------------------------------------------------------------------
// Renderers
// ----------------------------------------------------------------------

/// Captures every context it is asked to render; writes nothing
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    contexts: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_context(&self) -> Option<Map<String, Value>> {
        self.contexts.lock().unwrap().last().cloned()
    }

    pub fn render_count(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

impl DocumentRenderer for RecordingRenderer {
    fn render(
        &self,
        _template: &Path,
        context: &Map<String, Value>,
        output: &Path,
    ) -> Result<PathBuf, RenderError> {
        self.contexts.lock().unwrap().push(context.clone());
        Ok(output.to_path_buf())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(
        &self,
        template: &Path,
        _context: &Map<String, Value>,
        _output: &Path,
    ) -> Result<PathBuf, RenderError> {
        Err(RenderError::Render {
            path: template.to_path_buf(),
            message: "renderer exploded".to_string(),
        })
    }
}

// ----------------------------------------------------------------------
// On-disk fixture
// ----------------------------------------------------------------------

/// Default template file under `config/`
pub const TEMPLATE_FILE: &str = "report.md.hbs";

/// Temp directory laid out as `config/`, `data/` and `out/`, with a
/// placeholder template
#[derive(Debug)]
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["config", "data", "out"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let fixture = Self { dir };
        fixture.write_template("# Report\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Write a file relative to `config/`
    pub fn write_config(&self, name: &str, text: &str) -> PathBuf {
        let path = self.config_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    pub fn write_sheet_tasks(&self, yaml: &str) -> PathBuf {
        self.write_config(SHEET_TASKS_FILE, yaml)
    }

    pub fn write_paragraph_tasks(&self, yaml: &str) -> PathBuf {
        self.write_config(PARAGRAPH_TASKS_FILE, yaml)
    }

    pub fn write_template(&self, text: &str) -> PathBuf {
        self.write_config(TEMPLATE_FILE, text)
    }

    pub fn template_path(&self) -> PathBuf {
        self.config_dir().join(TEMPLATE_FILE)
    }

    pub fn write_csv(&self, sheet: &str, text: &str) -> PathBuf {
        let path = self.data_dir().join(format!("{sheet}.csv"));
        fs::write(&path, text).unwrap();
        path
    }

    /// Settings rooted at `config/`, writing to `out/`
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings::new(self.config_dir())
            .with_template(self.template_path())
            .with_output_dir(self.output_dir())
            .with_default_provider("scripted")
    }

    pub fn read_output(&self, name: &str) -> String {
        fs::read_to_string(self.output_dir().join(name)).unwrap()
    }

    pub fn read_diagnostics(&self) -> Value {
        serde_json::from_str(&self.read_output("diagnostics.json")).unwrap()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
