//! The extracted namespace: `{sheet: {field: value}}`

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::path::{FieldPath, Injection, PathError};
use crate::value::SheetRecord;

/// Nested values extracted during one run
///
/// Sheet entries are inserted whole, once, after coercion. The only later
/// mutation is [`ExtractedNamespace::inject_default`], which adds missing
/// leaves and never touches present ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedNamespace {
    root: Value,
}

impl ExtractedNamespace {
    /// Create an empty namespace
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Insert a coerced sheet record
    ///
    /// # Errors
    /// [`CoreError::DuplicateSheet`] if the sheet was already inserted.
    pub fn insert_sheet(&mut self, sheet: &str, record: SheetRecord) -> Result<(), CoreError> {
        let Some(map) = self.root.as_object_mut() else {
            return Err(CoreError::Path(PathError::NotAMapping(String::new())));
        };
        if map.contains_key(sheet) {
            return Err(CoreError::DuplicateSheet(sheet.to_string()));
        }
        let fields: Map<String, Value> = record
            .into_iter()
            .map(|(field, value)| (field, value.to_json()))
            .collect();
        map.insert(sheet.to_string(), Value::Object(fields));
        Ok(())
    }

    /// Check if a sheet entry exists
    #[inline]
    #[must_use]
    pub fn contains_sheet(&self, sheet: &str) -> bool {
        self.root.get(sheet).is_some()
    }

    /// Sheet names in insertion order
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.root
            .as_object()
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    /// Strict resolution of `path`
    #[inline]
    #[must_use]
    pub fn resolve(&self, path: &FieldPath) -> Value {
        path.resolve_strict(&self.root)
    }

    /// Add `value` at `path` if the leaf is missing
    ///
    /// # Errors
    /// Propagates [`PathError`] when the path cannot hold a leaf.
    pub fn inject_default(&mut self, path: &FieldPath, value: Value) -> Result<Injection, PathError> {
        path.inject(&mut self.root, value)
    }

    /// Copy of this namespace with `value` standing in for every present
    /// null leaf at `paths`
    ///
    /// The namespace itself is not touched; present leaves stay as stored.
    #[must_use]
    pub fn with_null_defaults<'p>(
        &self,
        paths: impl IntoIterator<Item = &'p FieldPath>,
        value: &Value,
    ) -> Self {
        let mut root = self.root.clone();
        for path in paths {
            path.replace_null(&mut root, value.clone());
        }
        Self { root }
    }

    /// Whole namespace as a JSON object
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Number of sheet entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.as_object().map_or(0, Map::len)
    }

    /// Check if no sheet has been inserted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the underlying JSON object map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        match self.root {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl Default for ExtractedNamespace {
    fn default() -> Self {
        Self::new()
    }
}
