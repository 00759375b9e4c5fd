//! sheetdoc Pipeline - from workbook to rendered document
//!
//! One run moves through a fixed sequence of states:
//! 1. **Validate**: pre-flight checks produce a skip plan
//! 2. **Extract**: each sheet goes through its extractor and the coercer
//! 3. **Resolve**: each paragraph is filled or generated from the namespace
//! 4. **Render**: namespace plus generated text go to the document renderer
//! 5. **Summarize**: diagnostics are written, always
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sheetdoc_pipeline::{execute, load_settings};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let settings = load_settings(Path::new("config"))?;
//! let report = execute(settings, Path::new("data")).await?;
//! println!("{} errors", report.counts.errors);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Pipeline modules
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod run;
pub mod settings;
pub mod state;
pub mod workbook;

// Re-exports for convenience
pub use error::{FatalError, PipelineError, RenderError, WorkbookError};
pub use orchestrator::{Pipeline, RunReport};
pub use render::{DocumentRenderer, HandlebarsRenderer, RenderContextBuilder};
pub use run::{check, execute, load_inputs, load_settings, CheckReport};
pub use settings::{PipelineSettings, SETTINGS_FILE};
pub use state::{allowed_transitions, validate_transition, RunState};
pub use workbook::{CsvWorkbook, Workbook};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a run
    pub use crate::{
        DocumentRenderer, Pipeline, PipelineSettings, RunReport, RunState, Workbook,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
