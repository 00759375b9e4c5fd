//! Skip plan produced by pre-flight validation

use indexmap::IndexSet;
use serde::Serialize;

/// Sheets and paragraphs excluded from the run
///
/// Computed once by [`crate::ConfigValidator`]; the orchestrator only reads
/// it, so an entry can never be dropped mid-run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipPlan {
    sheets: IndexSet<String>,
    paragraphs: IndexSet<String>,
}

impl SkipPlan {
    /// Create an empty plan
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn skip_sheet(&mut self, sheet: &str) -> bool {
        self.sheets.insert(sheet.to_string())
    }

    pub(crate) fn skip_paragraph(&mut self, id: &str) -> bool {
        self.paragraphs.insert(id.to_string())
    }

    /// Check if a sheet is excluded
    #[inline]
    #[must_use]
    pub fn is_sheet_skipped(&self, sheet: &str) -> bool {
        self.sheets.contains(sheet)
    }

    /// Check if a paragraph is excluded
    #[inline]
    #[must_use]
    pub fn is_paragraph_skipped(&self, id: &str) -> bool {
        self.paragraphs.contains(id)
    }

    /// Skipped sheet names, in the order they were skipped
    pub fn skipped_sheets(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(String::as_str)
    }

    /// Skipped paragraph ids, in the order they were skipped
    pub fn skipped_paragraphs(&self) -> impl Iterator<Item = &str> {
        self.paragraphs.iter().map(String::as_str)
    }

    /// Total number of skipped units
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.len() + self.paragraphs.len()
    }

    /// Check if nothing is skipped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty() && self.paragraphs.is_empty()
    }
}
