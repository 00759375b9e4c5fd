//! Pre-flight configuration validator
//!
//! Runs every check before any model call is made. Failures never abort the
//! run: each one either adds the unit to the [`SkipPlan`] or is recorded as a
//! warning the later phases can live with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::{resolve_reference, ParagraphMode, ParagraphTask, SheetTask, TaskConfig, TaskEntry};
use crate::diagnostics::{Diagnostics, Phase};
use crate::path::FieldPath;
use crate::plan::SkipPlan;

/// Context for validation
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Directory prompt references are relative to
    pub prompt_root: PathBuf,
    /// Document template the run will render, if one is configured
    pub template: Option<PathBuf>,
}

impl ValidationContext {
    /// Create a context rooted at `prompt_root`
    #[inline]
    #[must_use]
    pub fn new(prompt_root: impl Into<PathBuf>) -> Self {
        Self {
            prompt_root: prompt_root.into(),
            template: None,
        }
    }

    /// With document template
    #[inline]
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Resolve a prompt reference
    #[inline]
    #[must_use]
    pub fn prompt_path(&self, reference: &str) -> PathBuf {
        resolve_reference(&self.prompt_root, reference)
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Configuration pre-flight validator
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator {
    context: ValidationContext,
}

impl ConfigValidator {
    /// Create a validator with custom context
    #[inline]
    #[must_use]
    pub fn with_context(context: ValidationContext) -> Self {
        Self { context }
    }

    /// Get validation context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &ValidationContext {
        &self.context
    }

    /// Validate both task tables against the sheets the source provides
    ///
    /// # Checks
    /// 1. Sheet tasks: well-formed, prompt present on disk, fields declared,
    ///    sheet present in the source. Unsupported field types only warn.
    /// 2. Paragraph tasks: well-formed with a resolvable mode; generate mode
    ///    needs its prompt on disk. Unqualified dependency paths only warn.
    /// 3. Template existence (error, never a skip).
    pub fn validate(
        &self,
        tasks: &TaskConfig,
        available_sheets: &[String],
        diagnostics: &mut Diagnostics,
    ) -> SkipPlan {
        let mut plan = SkipPlan::new();
        let available: HashSet<&str> = available_sheets.iter().map(String::as_str).collect();

        for (name, entry) in tasks.sheets.iter() {
            let location = Phase::Sheet.at(name);
            let verdict = match entry {
                TaskEntry::Malformed(reason) => {
                    Err((true, format!("malformed sheet task: {reason}")))
                }
                TaskEntry::Parsed(task) => self.check_sheet(name, task, &available, &location, diagnostics),
            };
            if let Err((is_error, msg)) = verdict {
                plan.skip_sheet(name);
                if is_error {
                    diagnostics.error(location, format!("{msg}; sheet skipped"));
                } else {
                    diagnostics.warn(location, format!("{msg}; sheet skipped"));
                }
            }
        }

        let sheet_names: HashSet<&str> = tasks.sheets.ids().collect();
        for (id, entry) in tasks.paragraphs.iter() {
            let location = Phase::Paragraph.at(id);
            let verdict = match entry {
                TaskEntry::Malformed(reason) => Err(format!("malformed paragraph task: {reason}")),
                TaskEntry::Parsed(task) => self.check_paragraph(task, &location, diagnostics),
            };
            match verdict {
                Ok(()) => {
                    if sheet_names.contains(id) {
                        diagnostics.warn(
                            location,
                            format!("paragraph id '{id}' matches a sheet name; its text will replace that sheet's values in the render context"),
                        );
                    }
                }
                Err(msg) => {
                    plan.skip_paragraph(id);
                    diagnostics.error(location, format!("{msg}; paragraph skipped"));
                }
            }
        }

        self.check_template(diagnostics);

        tracing::info!(
            skipped_sheets = plan.skipped_sheets().count(),
            skipped_paragraphs = plan.skipped_paragraphs().count(),
            "configuration validated"
        );
        plan
    }

    /// Check one sheet task; `Err((is_error, message))` means skip
    fn check_sheet(
        &self,
        name: &str,
        task: &SheetTask,
        available: &HashSet<&str>,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), (bool, String)> {
        if task.prompt.trim().is_empty() {
            return Err((true, "no prompt configured".to_string()));
        }
        let prompt = self.context.prompt_path(&task.prompt);
        if !prompt.is_file() {
            return Err((true, format!("prompt file {} not found", prompt.display())));
        }
        if task.fields.is_empty() {
            return Err((true, "no fields declared".to_string()));
        }

        for (field, ty) in &task.fields {
            if !ty.is_supported() {
                diagnostics.warn(
                    location,
                    format!("field '{field}' has unsupported type '{ty}'; it will be treated as string"),
                );
            }
        }

        if !available.contains(name) {
            return Err((false, "sheet not found in source data".to_string()));
        }
        Ok(())
    }

    /// Check one paragraph task; `Err(message)` means skip
    fn check_paragraph(
        &self,
        task: &ParagraphTask,
        location: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), String> {
        for path in &task.depends_on {
            if !FieldPath::parse(path).is_qualified() {
                diagnostics.warn(
                    location,
                    format!("dependency '{path}' is not of the form Sheet.Field; it will resolve to null"),
                );
            }
        }

        match task.mode() {
            ParagraphMode::Fill => Ok(()),
            ParagraphMode::Generate => {
                let reference = task
                    .prompt_ref()
                    .ok_or_else(|| "generate mode requires a prompt".to_string())?;
                let prompt = self.context.prompt_path(reference);
                if prompt.is_file() {
                    Ok(())
                } else {
                    Err(format!("prompt file {} not found", prompt.display()))
                }
            }
        }
    }

    /// Record an error when the configured template is missing
    fn check_template(&self, diagnostics: &mut Diagnostics) {
        if let Some(template) = &self.context.template {
            if !Path::new(template).is_file() {
                diagnostics.error(
                    Phase::Template.at(template.display()),
                    "document template not found; rendering will fail",
                );
            }
        }
    }
}
