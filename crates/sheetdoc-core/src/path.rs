//! Dotted field paths over the extracted namespace
//!
//! Provides [`FieldPath`] and the resolution rules used by paragraph tasks to
//! address values such as `Safety.Rate` across sheets.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde_json::{Map, Value};

/// Path into the nested namespace
///
/// Segments are separated by `.`. Parsing never fails: a malformed path
/// simply does not resolve.
///
/// # Examples
/// - `Safety.Rate` → `["Safety", "Rate"]`
/// - `Finance.Q1.Revenue` → `["Finance", "Q1", "Revenue"]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<String>);

/// How a failed resolution is answered
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveMode {
    /// Missing → `null`
    Strict,
    /// Missing → the supplied default
    Default(Value),
}

/// Result of a default injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// The leaf was absent and the default was written
    Inserted,
    /// The leaf already existed and was left untouched
    AlreadyPresent,
}

impl FieldPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parse a dotted path
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self(path.split('.').map(str::to_string).collect())
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First segment, the sheet name for namespace paths
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Check for the `Sheet.Field` shape: at least one separator and no
    /// empty segment
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.0.len() >= 2 && self.0.iter().all(|s| !s.is_empty())
    }

    /// Find the value at this path
    ///
    /// Returns `Some(&Value::Null)` for a leaf that exists but holds null,
    /// and `None` when any segment is missing or a non-mapping is reached
    /// before the path is exhausted.
    #[must_use]
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut current = root;
        for segment in &self.0 {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolve against `root`, answering a miss according to `mode`
    #[must_use]
    pub fn resolve(&self, root: &Value, mode: &ResolveMode) -> Value {
        match (self.lookup(root), mode) {
            (Some(found), _) => found.clone(),
            (None, ResolveMode::Strict) => Value::Null,
            (None, ResolveMode::Default(default)) => default.clone(),
        }
    }

    /// Strict resolution: missing → `null`
    #[inline]
    #[must_use]
    pub fn resolve_strict(&self, root: &Value) -> Value {
        self.resolve(root, &ResolveMode::Strict)
    }

    /// Defaulted resolution: missing → `default`
    #[inline]
    #[must_use]
    pub fn resolve_or(&self, root: &Value, default: Value) -> Value {
        self.resolve(root, &ResolveMode::Default(default))
    }

    /// Write `value` at this path unless a leaf is already there
    ///
    /// Missing intermediate mappings are created. A present leaf, including
    /// one holding null, is never overwritten.
    ///
    /// # Errors
    /// - [`PathError::EmptyPath`] for the root path
    /// - [`PathError::NotAMapping`] when a segment other than the last lands
    ///   on a scalar or list
    pub fn inject(&self, root: &mut Value, value: Value) -> Result<Injection, PathError> {
        let Some((leaf, parents)) = self.0.split_last() else {
            return Err(PathError::EmptyPath);
        };

        let mut current = root;
        for (depth, segment) in parents.iter().enumerate() {
            let map = as_object_mut(current, &self.0[..depth])?;
            current = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let map = as_object_mut(current, parents)?;
        if map.contains_key(leaf) {
            return Ok(Injection::AlreadyPresent);
        }
        map.insert(leaf.clone(), value);
        Ok(Injection::Inserted)
    }

    /// Overwrite the leaf at this path if it is present and null
    ///
    /// Returns whether a write happened. Missing leaves are left missing.
    pub fn replace_null(&self, root: &mut Value, value: Value) -> bool {
        let mut current = root;
        for segment in &self.0 {
            match current.as_object_mut().and_then(|m| m.get_mut(segment)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        if self.0.is_empty() || !current.is_null() {
            return false;
        }
        *current = value;
        true
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn as_object_mut<'v>(
    value: &'v mut Value,
    at: &[String],
) -> Result<&'v mut Map<String, Value>, PathError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PathError::NotAMapping(at.join("."))),
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl Default for FieldPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to field paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Injection into the root
    #[error("cannot inject at the empty path")]
    EmptyPath,

    /// Traversal hit a non-mapping
    #[error("value at '{0}' is not a mapping")]
    NotAMapping(String),
}
