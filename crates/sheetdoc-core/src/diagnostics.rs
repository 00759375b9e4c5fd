//! Run-wide diagnostics collector
//!
//! An append-only list of leveled records. Recording never fails; the only
//! fallible operation is [`Diagnostics::persist`], which writes the summary
//! artifact at the end of a run.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Severity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Degraded but usable
    Warning,
    /// A unit or the output was lost
    Error,
}

/// Pipeline phase used as the prefix of a record's `where` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Configuration and source loading
    Load,
    /// Sheet task validation
    Sheet,
    /// Paragraph task validation
    Paragraph,
    /// Template existence check
    Template,
    /// Sheet extraction
    Extract,
    /// Field coercion
    Coerce,
    /// Paragraph resolution
    Para,
    /// Document rendering
    Render,
}

impl Phase {
    /// Label prefix
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Sheet => "SHEET",
            Self::Paragraph => "PARAGRAPH",
            Self::Template => "TEMPLATE",
            Self::Extract => "EXTRACT",
            Self::Coerce => "COERCE",
            Self::Para => "PARA",
            Self::Render => "RENDER",
        }
    }

    /// Build a `PHASE:identifier` label
    #[must_use]
    pub fn at(self, id: impl Display) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded anomaly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Severity
    pub level: Level,
    /// Phase and identifier, e.g. `EXTRACT:Safety`
    #[serde(rename = "where")]
    pub location: String,
    /// Human-readable message
    pub msg: String,
    /// Optional detail such as an error chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DiagnosticRecord {
    /// Create a warning record
    #[inline]
    #[must_use]
    pub fn warning(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            location: location.into(),
            msg: msg.into(),
            detail: None,
        }
    }

    /// Create an error record
    #[inline]
    #[must_use]
    pub fn error(location: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            location: location.into(),
            msg: msg.into(),
            detail: None,
        }
    }

    /// Attach detail
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Aggregate counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Number of error records
    pub errors: usize,
    /// Number of warning records
    pub warnings: usize,
}

impl Counts {
    /// Total records
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

/// Persisted diagnostics artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    /// When the summary was produced
    pub generated_at: DateTime<Utc>,
    /// Aggregate counts
    pub counts: Counts,
    /// Records in the order they were raised
    pub items: Vec<DiagnosticRecord>,
}

/// Collector owned by one pipeline run
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<DiagnosticRecord>,
}

impl Diagnostics {
    /// Create an empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: DiagnosticRecord) {
        match record.level {
            Level::Warning => tracing::warn!(location = %record.location, "{}", record.msg),
            Level::Error => tracing::error!(
                location = %record.location,
                detail = record.detail.as_deref().unwrap_or(""),
                "{}",
                record.msg
            ),
        }
        self.items.push(record);
    }

    /// Record a warning
    pub fn warn(&mut self, location: impl Into<String>, msg: impl Into<String>) {
        self.push(DiagnosticRecord::warning(location, msg));
    }

    /// Record an error
    pub fn error(&mut self, location: impl Into<String>, msg: impl Into<String>) {
        self.push(DiagnosticRecord::error(location, msg));
    }

    /// Record an error with detail
    pub fn error_with_detail(
        &mut self,
        location: impl Into<String>,
        msg: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(DiagnosticRecord::error(location, msg).with_detail(detail));
    }

    /// Records in order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[DiagnosticRecord] {
        &self.items
    }

    /// Records whose label starts with `prefix`
    pub fn at<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a DiagnosticRecord> + 'a {
        self.items
            .iter()
            .filter(move |r| r.location.starts_with(prefix))
    }

    /// Aggregate counts
    #[must_use]
    pub fn counts(&self) -> Counts {
        self.items.iter().fold(Counts::default(), |mut c, r| {
            match r.level {
                Level::Warning => c.warnings += 1,
                Level::Error => c.errors += 1,
            }
            c
        })
    }

    /// Number of error records
    #[inline]
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.counts().errors
    }

    /// Number of warning records
    #[inline]
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.counts().warnings
    }

    /// Get number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build the summary artifact
    #[must_use]
    pub fn summary(&self) -> DiagnosticsReport {
        DiagnosticsReport {
            generated_at: Utc::now(),
            counts: self.counts(),
            items: self.items.clone(),
        }
    }

    /// Write the summary as pretty JSON, creating parent directories
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be written.
    pub fn persist(&self, path: &Path) -> Result<DiagnosticsReport, CoreError> {
        let report = self.summary();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(path, json).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            errors = report.counts.errors,
            warnings = report.counts.warnings,
            "diagnostics written"
        );
        Ok(report)
    }
}
