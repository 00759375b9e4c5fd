//! Coercion of raw extracted values into declared field types
//!
//! Extraction returns whatever the model produced: numbers as text with
//! thousands separators, percentages, single values where a list was asked
//! for. [`TypeCoercer`] maps each declared field onto a [`FieldValue`]. A
//! field that cannot be converted becomes `Null` and a warning is recorded;
//! no field can stop another from being coerced.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::diagnostics::{Diagnostics, Phase};
use crate::value::{canonical_text, FieldType, FieldValue, SheetRecord};

/// Characters dropped from numeric text before parsing
const GROUPING_CHARS: &[char] = &[',', '，', '_', ' ', '\u{a0}', '\u{202f}', '\''];

/// Trailing percent signs (ASCII and full-width)
const PERCENT_SIGNS: &[char] = &['%', '％'];

/// Coercion failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// Text did not parse as a finite decimal
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// Converts raw extraction output into typed sheet records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCoercer {
    percent_as_fraction: bool,
}

impl TypeCoercer {
    /// Create a coercer
    ///
    /// With `percent_as_fraction`, `"85%"` becomes `0.85`; otherwise `85.0`.
    #[inline]
    #[must_use]
    pub fn new(percent_as_fraction: bool) -> Self {
        Self {
            percent_as_fraction,
        }
    }

    /// Whether percentages are divided by 100
    #[inline]
    #[must_use]
    pub fn percent_as_fraction(&self) -> bool {
        self.percent_as_fraction
    }

    /// Coerce every declared field of one sheet
    ///
    /// Fields are produced in declaration order. Raw keys that were not
    /// declared are dropped; declared keys missing from `raw` become `Null`.
    pub fn coerce(
        &self,
        sheet: &str,
        raw: &Map<String, Value>,
        declared: &IndexMap<String, FieldType>,
        diagnostics: &mut Diagnostics,
    ) -> SheetRecord {
        declared
            .iter()
            .map(|(field, ty)| {
                let value = match self.coerce_value(raw.get(field), ty) {
                    Ok(value) => value,
                    Err(err) => {
                        diagnostics.warn(
                            Phase::Coerce.at(format_args!("{sheet}.{field}")),
                            format!("{err}; field set to null"),
                        );
                        FieldValue::Null
                    }
                };
                (field.clone(), value)
            })
            .collect()
    }

    /// Coerce a single value
    ///
    /// # Errors
    /// [`CoercionError::NotANumber`] when a `number` field cannot be parsed.
    pub fn coerce_value(
        &self,
        raw: Option<&Value>,
        ty: &FieldType,
    ) -> Result<FieldValue, CoercionError> {
        let raw = match raw {
            None | Some(Value::Null) => return Ok(FieldValue::Null),
            Some(v) => v,
        };

        match ty {
            FieldType::Number => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(FieldValue::Number)
                    .ok_or_else(|| CoercionError::NotANumber(n.to_string())),
                other => {
                    parse_number(&canonical_text(other), self.percent_as_fraction)
                        .map(FieldValue::Number)
                }
            },
            FieldType::StringList => Ok(FieldValue::TextList(match raw {
                Value::Array(items) => items.iter().map(canonical_text).collect(),
                single => vec![canonical_text(single)],
            })),
            FieldType::String | FieldType::Unsupported(_) => {
                Ok(FieldValue::Text(canonical_text(raw)))
            }
        }
    }
}

impl Default for TypeCoercer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Parse numeric cell text
///
/// Surrounding whitespace and grouping separators (`,`, full-width comma,
/// `_`, spaces, apostrophes) are removed, then one trailing percent sign is
/// detected. The rest must parse as a finite decimal.
///
/// # Errors
/// [`CoercionError::NotANumber`] for anything else.
pub fn parse_number(text: &str, percent_as_fraction: bool) -> Result<f64, CoercionError> {
    let trimmed = text.trim();
    let (body, is_percent) = match trimmed.strip_suffix(PERCENT_SIGNS) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let cleaned: String = body.chars().filter(|c| !GROUPING_CHARS.contains(c)).collect();

    let parsed = cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && !cleaned.is_empty())
        .ok_or_else(|| CoercionError::NotANumber(text.to_string()))?;

    Ok(if is_percent && percent_as_fraction {
        parsed / 100.0
    } else {
        parsed
    })
}
