//! Task configuration tables
//!
//! Two YAML tables drive a run:
//! - `sheet_tasks.yaml`: sheet name → fields to extract
//! - `paragraph_tasks.yaml`: paragraph id → how to produce its text
//!
//! Each entry is parsed independently. A file that cannot be read or parsed
//! is a [`ConfigError`]; a single malformed entry is kept as
//! [`TaskEntry::Malformed`] so validation can skip it and the run goes on.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::error::ConfigError;
use crate::path::FieldPath;
use crate::value::FieldType;

/// Sheet task table file name
pub const SHEET_TASKS_FILE: &str = "sheet_tasks.yaml";

/// Paragraph task table file name
pub const PARAGRAPH_TASKS_FILE: &str = "paragraph_tasks.yaml";

/// Extraction task for one sheet
///
/// ```yaml
/// Safety:
///   prompt: prompts/safety.hbs
///   fields:
///     Rate: number
///     Incidents: array[string]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetTask {
    /// Field name → declared type, in extraction order
    #[serde(alias = "keys", default)]
    pub fields: IndexMap<String, FieldType>,
    /// Prompt template reference
    #[serde(default)]
    pub prompt: String,
    /// Completion provider id (falls back to the run default)
    #[serde(default)]
    pub provider: Option<String>,
    /// Extractor agent name (falls back to the run default)
    #[serde(default)]
    pub agent: Option<String>,
}

impl SheetTask {
    /// Create a task
    #[must_use]
    pub fn new(prompt: impl Into<String>, fields: IndexMap<String, FieldType>) -> Self {
        Self {
            fields,
            prompt: prompt.into(),
            provider: None,
            agent: None,
        }
    }

    /// With provider
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// With agent name
    #[inline]
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// How a paragraph placeholder is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParagraphMode {
    /// Narrative text from a generator agent
    Generate,
    /// Resolved field values projected directly, no agent call
    Fill,
}

/// Paragraph task for one document placeholder
///
/// ```yaml
/// summary:
///   prompt: prompts/summary.hbs
///   depends_on: [Safety.Rate, Finance.Revenue]
/// safety_table:
///   mode: fill
///   depends_on: [Safety.Rate]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphTask {
    /// Explicit mode; inferred from `prompt` when absent
    #[serde(default)]
    pub mode: Option<ParagraphMode>,
    /// Dotted dependency paths, in order
    #[serde(alias = "keys", default)]
    pub depends_on: Vec<String>,
    /// Prompt template reference (generate mode)
    #[serde(default)]
    pub prompt: Option<String>,
    /// Completion provider id (generate mode)
    #[serde(default)]
    pub provider: Option<String>,
    /// Generator agent name (generate mode)
    #[serde(default)]
    pub agent: Option<String>,
    /// Extra render-context key for the generated text
    #[serde(default)]
    pub placeholder: Option<String>,
}

impl ParagraphTask {
    /// Fill-mode task over `depends_on`
    #[must_use]
    pub fn fill(depends_on: Vec<String>) -> Self {
        Self {
            mode: Some(ParagraphMode::Fill),
            depends_on,
            prompt: None,
            provider: None,
            agent: None,
            placeholder: None,
        }
    }

    /// Generate-mode task rendering `prompt`
    #[must_use]
    pub fn generate(prompt: impl Into<String>, depends_on: Vec<String>) -> Self {
        Self {
            mode: Some(ParagraphMode::Generate),
            depends_on,
            prompt: Some(prompt.into()),
            provider: None,
            agent: None,
            placeholder: None,
        }
    }

    /// With placeholder alias
    #[inline]
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// With provider
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Non-blank prompt reference
    #[must_use]
    pub fn prompt_ref(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Effective mode: explicit, else `generate` when a prompt is present
    #[must_use]
    pub fn mode(&self) -> ParagraphMode {
        match (self.mode, self.prompt_ref()) {
            (Some(mode), _) => mode,
            (None, Some(_)) => ParagraphMode::Generate,
            (None, None) => ParagraphMode::Fill,
        }
    }

    /// Parsed dependency paths
    #[must_use]
    pub fn dependency_paths(&self) -> Vec<FieldPath> {
        self.depends_on.iter().map(|p| FieldPath::parse(p)).collect()
    }
}

/// One table entry as loaded
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEntry<T> {
    /// Well-formed task
    Parsed(T),
    /// Entry that did not deserialize, with the reason
    Malformed(String),
}

impl<T> TaskEntry<T> {
    /// Get parsed task, if any
    #[inline]
    #[must_use]
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(task) => Some(task),
            Self::Malformed(_) => None,
        }
    }
}

/// Ordered table of tasks keyed by stable identifier
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTable<T> {
    entries: IndexMap<String, TaskEntry<T>>,
}

impl<T> TaskTable<T> {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert a parsed task
    pub fn insert(&mut self, id: impl Into<String>, task: T) {
        self.entries.insert(id.into(), TaskEntry::Parsed(task));
    }

    /// Insert a malformed entry
    pub fn insert_malformed(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.entries
            .insert(id.into(), TaskEntry::Malformed(reason.into()));
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, task: T) -> Self {
        self.insert(id, task);
        self
    }

    /// Look up an entry
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskEntry<T>> {
        self.entries.get(id)
    }

    /// All entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskEntry<T>)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), e))
    }

    /// Well-formed tasks in declaration order
    pub fn parsed(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .filter_map(|(id, e)| e.parsed().map(|t| (id.as_str(), t)))
    }

    /// Task ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Get number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: DeserializeOwned> TaskTable<T> {
    /// Parse a YAML table; `origin` names the source in errors
    ///
    /// An empty document is an empty table.
    ///
    /// # Errors
    /// Returns error if the text is not YAML, the top level is not a mapping,
    /// or a key is not a scalar.
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let root: YamlValue = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let mapping = match root {
            YamlValue::Null => return Ok(Self::new()),
            YamlValue::Mapping(mapping) => mapping,
            _ => {
                return Err(ConfigError::NotAMapping {
                    path: origin.to_path_buf(),
                })
            }
        };

        let mut table = Self::new();
        for (key, value) in mapping {
            let id = scalar_key(&key).ok_or_else(|| ConfigError::InvalidKey {
                path: origin.to_path_buf(),
                key: format!("{key:?}"),
            })?;
            match serde_yaml::from_value::<T>(value) {
                Ok(task) => table.insert(id, task),
                Err(err) => table.insert_malformed(id, err.to_string()),
            }
        }
        Ok(table)
    }

    /// Read and parse a YAML table file
    ///
    /// # Errors
    /// Returns error if the file is unreadable or unparseable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text, path)
    }
}

impl<T> Default for TaskTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar_key(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Both task tables of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskConfig {
    /// Sheet extraction tasks
    pub sheets: TaskTable<SheetTask>,
    /// Paragraph tasks
    pub paragraphs: TaskTable<ParagraphTask>,
}

impl TaskConfig {
    /// Create from tables
    #[inline]
    #[must_use]
    pub fn new(sheets: TaskTable<SheetTask>, paragraphs: TaskTable<ParagraphTask>) -> Self {
        Self { sheets, paragraphs }
    }

    /// Load both tables from a configuration directory
    ///
    /// # Errors
    /// Returns error if either file is missing or unparseable.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let sheets = TaskTable::load(&config_dir.join(SHEET_TASKS_FILE))?;
        let paragraphs = TaskTable::load(&config_dir.join(PARAGRAPH_TASKS_FILE))?;
        tracing::debug!(
            sheets = sheets.len(),
            paragraphs = paragraphs.len(),
            dir = %config_dir.display(),
            "task configuration loaded"
        );
        Ok(Self { sheets, paragraphs })
    }
}

/// Resolve a prompt or template reference against `root`
///
/// Absolute references are returned unchanged.
#[must_use]
pub fn resolve_reference(root: &Path, reference: &str) -> PathBuf {
    let path = Path::new(reference.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
