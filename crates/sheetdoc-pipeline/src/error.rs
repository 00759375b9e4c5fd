//! Error types for the sheetdoc pipeline
//!
//! Two tiers:
//! - [`FatalError`]: the run cannot start (configuration unparseable, source
//!   data absent). The binary exits non-zero.
//! - [`PipelineError`]: anything confined to one unit or to the render step.
//!   Always recorded as a diagnostic, never propagated out of a run.

use std::path::PathBuf;

use sheetdoc_agents::AgentError;
use sheetdoc_core::{ConfigError, CoreError, PathError};

use crate::state::RunState;

/// Workbook source errors
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    /// Source path does not exist
    #[error("source data not found: {0}")]
    NotFound(PathBuf),

    /// Source file is not CSV
    #[error("unsupported source {0}: expected a .csv file or a directory of .csv files")]
    Unsupported(PathBuf),

    /// Source cannot be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Sheet is not valid CSV
    #[error("cannot parse sheet {path}: {source}")]
    Csv {
        /// Sheet file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: csv::Error,
    },

    /// Requested sheet is not in the source
    #[error("sheet '{0}' not found in source")]
    MissingSheet(String),
}

impl WorkbookError {
    /// Check if the whole source is absent
    #[inline]
    #[must_use]
    pub fn is_source_missing(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Document rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No template configured
    #[error("no document template configured")]
    NoTemplate,

    /// Template file missing or unreadable
    #[error("cannot read template {path}: {source}")]
    Template {
        /// Template path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Template failed to render
    #[error("cannot render {path}: {message}")]
    Render {
        /// Template path
        path: PathBuf,
        /// Engine message
        message: String,
    },

    /// Output could not be written
    #[error("cannot write {path}: {source}")]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors confined to one unit or the render step
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Core failure (namespace, table)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Agent or provider failure
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Workbook failure
    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    /// Render failure
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Default injection failed
    #[error("cannot inject default: {0}")]
    Inject(#[from] PathError),

    /// Run state machine violated
    #[error("illegal state transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },
}

impl PipelineError {
    /// Check if error belongs to a single sheet or paragraph
    #[inline]
    #[must_use]
    pub fn is_unit_failure(&self) -> bool {
        !matches!(self, Self::Render(_) | Self::IllegalTransition { .. })
    }
}

/// Conditions that stop a run before it starts
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// Task configuration or settings could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source data absent or unreadable as a whole
    #[error("source data error: {0}")]
    Source(#[from] WorkbookError),
}

impl FatalError {
    /// Check if the source data was missing
    #[inline]
    #[must_use]
    pub fn is_source_missing(&self) -> bool {
        matches!(self, Self::Source(e) if e.is_source_missing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_failure_classification() {
        let err = PipelineError::Agent(AgentError::UnknownAgent("X".into()));
        assert!(err.is_unit_failure());
        let err = PipelineError::Render(RenderError::NoTemplate);
        assert!(!err.is_unit_failure());
    }

    #[test]
    fn fatal_source_missing() {
        let err = FatalError::from(WorkbookError::NotFound("data.xlsx".into()));
        assert!(err.is_source_missing());
        assert!(err.to_string().contains("data.xlsx"));
    }
}
