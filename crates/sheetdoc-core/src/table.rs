//! Tabular view of one spreadsheet sheet

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Header row plus data rows of cell text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTable {
    /// Sheet name
    pub name: String,
    /// Column headers
    pub headers: Vec<String>,
    /// Data rows, one string per cell
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Create a table
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Number of data rows
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the sheet has no data rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV text, header first, no index column
    ///
    /// Ragged rows are written as they are.
    ///
    /// # Errors
    /// Returns error if the CSV writer fails.
    pub fn to_csv(&self) -> Result<String, CoreError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        if !self.headers.is_empty() {
            writer
                .write_record(&self.headers)
                .map_err(|e| CoreError::Table(e.to_string()))?;
        }
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| CoreError::Table(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CoreError::Table(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CoreError::Table(e.to_string()))
    }
}
