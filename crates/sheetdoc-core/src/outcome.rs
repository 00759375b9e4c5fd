//! Per-unit result type
//!
//! Every sheet and paragraph ends in exactly one [`UnitOutcome`]. Turning the
//! outcome into a diagnostic happens in one place, [`UnitOutcome::record`],
//! so a unit cannot be skipped or fail without leaving a record.

use std::error::Error as StdError;
use std::fmt::Write as _;

use crate::diagnostics::{DiagnosticRecord, Diagnostics};

/// Result of processing one sheet or paragraph
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum UnitOutcome<T> {
    /// Unit produced its output
    Completed(T),
    /// Unit was deliberately not processed (recorded as a warning)
    Skipped {
        /// Why
        reason: String,
    },
    /// Unit failed (recorded as an error)
    Failed {
        /// What went wrong
        reason: String,
        /// Error chain, if available
        detail: Option<String>,
    },
}

impl<T> UnitOutcome<T> {
    /// Skipped outcome
    #[inline]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Failed outcome from an error, keeping its source chain as detail
    pub fn failed<E: StdError + ?Sized>(err: &E) -> Self {
        let mut chain = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            if !chain.is_empty() {
                chain.push('\n');
            }
            let _ = write!(chain, "caused by: {cause}");
            source = cause.source();
        }
        Self::Failed {
            reason: err.to_string(),
            detail: (!chain.is_empty()).then_some(chain),
        }
    }

    /// Check for [`UnitOutcome::Completed`]
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Check for [`UnitOutcome::Failed`]
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Record skips and failures under `location`, yielding the output of a
    /// completed unit
    pub fn record(self, location: &str, diagnostics: &mut Diagnostics) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped { reason } => {
                diagnostics.warn(location, reason);
                None
            }
            Self::Failed { reason, detail } => {
                let record = DiagnosticRecord::error(location, reason);
                diagnostics.push(match detail {
                    Some(detail) => record.with_detail(detail),
                    None => record,
                });
                None
            }
        }
    }
}

impl<T, E: StdError> From<Result<T, E>> for UnitOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(err) => Self::failed(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Level;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn completed_records_nothing() {
        let mut d = Diagnostics::new();
        assert_eq!(UnitOutcome::Completed(3).record("X", &mut d), Some(3));
        assert!(d.is_empty());
    }

    #[test]
    fn skipped_records_warning() {
        let mut d = Diagnostics::new();
        let out: Option<()> = UnitOutcome::skipped("missing").record("PARA:p", &mut d);
        assert!(out.is_none());
        assert_eq!(d.items()[0].level, Level::Warning);
    }

    #[test]
    fn failed_keeps_error_chain() {
        let mut d = Diagnostics::new();
        let outcome: UnitOutcome<()> = Err::<(), _>(Outer(Inner)).into();
        assert!(outcome.is_failed());
        outcome.record("EXTRACT:S", &mut d);
        let rec = &d.items()[0];
        assert_eq!(rec.level, Level::Error);
        assert_eq!(rec.msg, "outer");
        assert_eq!(rec.detail.as_deref(), Some("caused by: inner"));
    }
}
