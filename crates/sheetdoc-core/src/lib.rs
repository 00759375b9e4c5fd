//! sheetdoc Core - namespace, coercion and pre-flight validation
//!
//! The building blocks the pipeline is assembled from:
//! - Dotted path resolution over the extracted namespace
//! - Coercion of free-text cells into the declared field types
//! - Task configuration tables and their pre-flight validation
//! - The run-wide diagnostics collector
//!
//! # Example
//!
//! ```rust
//! use sheetdoc_core::{Diagnostics, FieldType, FieldValue, TypeCoercer};
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! let mut diagnostics = Diagnostics::new();
//! let raw = json!({"Rate": "85%"});
//! let mut declared = IndexMap::new();
//! declared.insert("Rate".to_string(), FieldType::Number);
//!
//! let record = TypeCoercer::new(true).coerce("Safety", raw.as_object().unwrap(), &declared, &mut diagnostics);
//! assert_eq!(record["Rate"], FieldValue::Number(0.85));
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod coerce;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod namespace;
pub mod outcome;
pub mod path;
pub mod plan;
pub mod table;
pub mod validate;
pub mod value;

// Re-exports for convenience
pub use coerce::{parse_number, CoercionError, TypeCoercer};
pub use config::{
    resolve_reference, ParagraphMode, ParagraphTask, SheetTask, TaskConfig, TaskEntry, TaskTable,
    PARAGRAPH_TASKS_FILE, SHEET_TASKS_FILE,
};
pub use diagnostics::{Counts, DiagnosticRecord, Diagnostics, DiagnosticsReport, Level, Phase};
pub use error::{ConfigError, CoreError};
pub use namespace::ExtractedNamespace;
pub use outcome::UnitOutcome;
pub use path::{FieldPath, Injection, PathError, ResolveMode};
pub use plan::SkipPlan;
pub use table::SheetTable;
pub use validate::{ConfigValidator, ValidationContext};
pub use value::{canonical_text, FieldType, FieldValue, SheetRecord};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sheetdoc Core
    pub use crate::{
        ConfigValidator, Diagnostics, ExtractedNamespace, FieldPath, FieldType, FieldValue,
        ParagraphMode, ParagraphTask, SheetTask, SkipPlan, TaskConfig, TypeCoercer, UnitOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
