//! Run entry points
//!
//! Loading the task tables and opening the source are the only steps that can
//! stop a run. Both record a `LOAD` error and attempt a diagnostics dump before
//! the fatal error is returned.

use std::path::Path;

use serde::Serialize;
use sheetdoc_agents::ProviderRegistry;
use sheetdoc_core::{
    ConfigValidator, Counts, DiagnosticRecord, Diagnostics, Phase, SkipPlan, TaskConfig,
    ValidationContext,
};

use crate::error::FatalError;
use crate::orchestrator::{Pipeline, RunReport};
use crate::settings::PipelineSettings;
use crate::workbook::{CsvWorkbook, Workbook};

/// Result of a validation-only pass
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Sheets found in the source
    pub sheets: Vec<String>,
    /// Units validation would skip
    pub skipped: SkipPlan,
    /// Aggregate counts
    pub counts: Counts,
    /// Every record, in order
    pub diagnostics: Vec<DiagnosticRecord>,
}

/// Load settings from `config_dir`
///
/// # Errors
/// [`FatalError::Config`] if `pipeline.yaml` exists but cannot be parsed.
pub fn load_settings(config_dir: &Path) -> Result<PipelineSettings, FatalError> {
    PipelineSettings::load(config_dir)
        .map_err(|err| record_fatal(&PipelineSettings::new(config_dir), config_dir, err.into()))
}

/// Load the task tables and open the source workbook
///
/// # Errors
/// [`FatalError`] if either table is unparseable or the source is absent.
pub fn load_inputs(
    settings: &PipelineSettings,
    source: &Path,
) -> Result<(TaskConfig, CsvWorkbook), FatalError> {
    let tasks = TaskConfig::load(&settings.config_dir)
        .map_err(|err| record_fatal(settings, &settings.config_dir, err.into()))?;
    let workbook =
        CsvWorkbook::open(source).map_err(|err| record_fatal(settings, source, err.into()))?;
    Ok((tasks, workbook))
}

/// Run the whole pipeline with providers configured from the environment
///
/// # Errors
/// [`FatalError`] from [`load_inputs`]; nothing after that is fatal.
pub async fn execute(settings: PipelineSettings, source: &Path) -> Result<RunReport, FatalError> {
    let (tasks, workbook) = load_inputs(&settings, source)?;
    let providers = providers_for(&settings, &tasks);
    tracing::info!(
        source = %source.display(),
        sheets = workbook.sheet_names().len(),
        providers = providers.len(),
        "run starting"
    );
    Ok(Pipeline::new(settings)
        .with_providers(providers)
        .run(&tasks, &workbook)
        .await)
}

/// Validate configuration against the source without calling any model
///
/// # Errors
/// [`FatalError`] from [`load_inputs`].
pub fn check(settings: &PipelineSettings, source: &Path) -> Result<CheckReport, FatalError> {
    let (tasks, workbook) = load_inputs(settings, source)?;
    let sheets = workbook.sheet_names();

    let mut context = ValidationContext::new(settings.prompt_root());
    if let Some(template) = &settings.template {
        context = context.with_template(template);
    }
    let mut diagnostics = Diagnostics::new();
    let skipped = ConfigValidator::with_context(context).validate(&tasks, &sheets, &mut diagnostics);

    Ok(CheckReport {
        sheets,
        skipped,
        counts: diagnostics.counts(),
        diagnostics: diagnostics.items().to_vec(),
    })
}

/// Provider ids the run may need: the default plus every per-task override
fn providers_for(settings: &PipelineSettings, tasks: &TaskConfig) -> ProviderRegistry {
    let mut ids: Vec<&str> = vec![settings.default_provider.as_str()];
    let overrides = tasks
        .sheets
        .parsed()
        .filter_map(|(_, t)| t.provider.as_deref())
        .chain(tasks.paragraphs.parsed().filter_map(|(_, t)| t.provider.as_deref()));
    for id in overrides {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ProviderRegistry::from_env(&ids)
}

/// Record a fatal condition and dump diagnostics best-effort
fn record_fatal(settings: &PipelineSettings, origin: &Path, err: FatalError) -> FatalError {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error(Phase::Load.at(origin.display()), err.to_string());
    if let Err(dump) = diagnostics.persist(&settings.diagnostics_path()) {
        tracing::error!(err = %dump, "diagnostics could not be written");
    }
    err
}
