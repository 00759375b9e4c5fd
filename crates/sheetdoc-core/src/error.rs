//! Error types for sheetdoc Core
//!
//! Configuration errors are the only ones that can end a run; everything
//! else in this crate degrades to a diagnostic record.

use std::path::PathBuf;

use crate::path::PathError;

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Task configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Path traversal or injection failed
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// A sheet entry was written twice into the namespace
    #[error("sheet '{0}' is already present in the namespace")]
    DuplicateSheet(String),

    /// Table could not be rendered as text
    #[error("table error: {0}")]
    Table(String),

    /// Filesystem failure
    #[error("i/o error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Check if error is a configuration failure
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Task configuration loading errors
///
/// Every variant means the configuration could not be parsed at all, which
/// is one of the two run-fatal conditions.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File missing or unreadable
    #[error("cannot read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// Top level is not a keyed table
    #[error("{path}: top level must be a mapping of task id to task")]
    NotAMapping {
        /// File path
        path: PathBuf,
    },

    /// A task id is not a scalar
    #[error("{path}: task ids must be scalars, found {key}")]
    InvalidKey {
        /// File path
        path: PathBuf,
        /// Offending key, debug-formatted
        key: String,
    },
}
