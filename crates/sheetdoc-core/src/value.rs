//! Declared field types and canonical field values

use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coerced fields of one sheet, in declaration order
pub type SheetRecord = IndexMap<String, FieldValue>;

/// Declared type of an extracted field
///
/// Parsed from the configuration strings `number`, `string` and
/// `array[string]`. Anything else is kept as [`FieldType::Unsupported`] so the
/// validator can warn about it; coercion treats it as `string`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Decimal number
    Number,
    /// Free text
    String,
    /// List of text values
    StringList,
    /// Unrecognised declaration
    Unsupported(String),
}

impl FieldType {
    /// Configuration spelling of this type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::StringList => "array[string]",
            Self::Unsupported(raw) => raw,
        }
    }

    /// Check if the declaration is one of the supported types
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "number" => Self::Number,
            "string" => Self::String,
            "array[string]" => Self::StringList,
            _ => Self::Unsupported(raw),
        }
    }
}

impl From<&str> for FieldType {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.as_str().to_string()
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced field value
///
/// Every field in the namespace holds exactly one of these four shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Decimal number
    Number(f64),
    /// Text
    Text(String),
    /// List of text values
    TextList(Vec<String>),
    /// No value
    Null,
}

impl FieldValue {
    /// Check for [`FieldValue::Null`]
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert to the JSON form stored in the namespace
    ///
    /// Whole numbers become JSON integers so templates print `50`, not `50.0`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::TextList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            Self::Null => Value::Null,
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        value.to_json()
    }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> Value {
    const I64_EDGE: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < I64_EDGE {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Canonical text form of a raw JSON value
///
/// Strings are taken verbatim, null becomes the empty string and containers
/// fall back to compact JSON.
#[must_use]
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
