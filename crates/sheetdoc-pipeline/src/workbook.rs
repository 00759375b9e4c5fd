//! Workbook sources
//!
//! A workbook is a set of named sheets. [`CsvWorkbook`] reads either a
//! directory of `.csv` files (one sheet per file, named by file stem) or a
//! single `.csv` file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sheetdoc_core::SheetTable;

use crate::error::WorkbookError;

/// Source of sheet tables
pub trait Workbook: Send + Sync {
    /// Sheet names in source order
    fn sheet_names(&self) -> Vec<String>;

    /// Load one sheet
    ///
    /// # Errors
    /// [`WorkbookError::MissingSheet`] for an unknown name, or a read/parse
    /// error for that sheet.
    fn sheet(&self, name: &str) -> Result<SheetTable, WorkbookError>;
}

/// Workbook backed by CSV files
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
    sheets: BTreeMap<String, PathBuf>,
}

impl CsvWorkbook {
    /// Open a directory of `.csv` files or a single `.csv` file
    ///
    /// # Errors
    /// - [`WorkbookError::NotFound`] if `path` does not exist
    /// - [`WorkbookError::Unsupported`] if `path` is a file without a `.csv`
    ///   extension
    /// - [`WorkbookError::Io`] if the directory cannot be listed
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        if !path.exists() {
            return Err(WorkbookError::NotFound(path.to_path_buf()));
        }

        let mut sheets = BTreeMap::new();
        if path.is_dir() {
            let entries = fs::read_dir(path).map_err(|source| WorkbookError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| WorkbookError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let file = entry.path();
                if let Some(name) = csv_stem(&file) {
                    sheets.insert(name, file);
                }
            }
        } else {
            let name =
                csv_stem(path).ok_or_else(|| WorkbookError::Unsupported(path.to_path_buf()))?;
            sheets.insert(name, path.to_path_buf());
        }

        tracing::debug!(source = %path.display(), sheets = sheets.len(), "workbook opened");
        Ok(Self {
            root: path.to_path_buf(),
            sheets,
        })
    }

    /// Path the workbook was opened from
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn csv_stem(path: &Path) -> Option<String> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv || !path.is_file() {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

impl Workbook for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    fn sheet(&self, name: &str) -> Result<SheetTable, WorkbookError> {
        let path = self
            .sheets
            .get(name)
            .ok_or_else(|| WorkbookError::MissingSheet(name.to_string()))?;
        let csv_error = |source| WorkbookError::Csv {
            path: path.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(SheetTable::new(name, headers, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvWorkbook::open(&dir.path().join("absent")).unwrap_err();
        assert!(err.is_source_missing());
    }

    #[test]
    fn directory_sheets_sorted_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Safety.csv"), "Metric,Value\nRate,50%\n").unwrap();
        fs::write(dir.path().join("Finance.CSV"), "A\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let wb = CsvWorkbook::open(dir.path()).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Finance", "Safety"]);

        let table = wb.sheet("Safety").unwrap();
        assert_eq!(table.headers, vec!["Metric", "Value"]);
        assert_eq!(table.rows, vec![vec!["Rate".to_string(), "50%".to_string()]]);
    }

    #[test]
    fn single_file_is_one_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Safety.csv");
        fs::write(&file, "Rate\n\"1,234.5\"\n").unwrap();

        let wb = CsvWorkbook::open(&file).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Safety"]);
        assert_eq!(wb.sheet("Safety").unwrap().rows[0][0], "1,234.5");
    }

    #[test]
    fn non_csv_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.xlsx");
        fs::write(&file, b"PK\x03\x04").unwrap();

        let err = CsvWorkbook::open(&file).unwrap_err();
        assert!(matches!(err, WorkbookError::Unsupported(ref p) if *p == file));
        assert!(!err.is_source_missing());
    }

    #[test]
    fn unknown_sheet_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let wb = CsvWorkbook::open(dir.path()).unwrap();
        assert!(matches!(wb.sheet("X"), Err(WorkbookError::MissingSheet(_))));
    }
}
