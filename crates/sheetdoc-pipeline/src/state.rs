//! Run state machine
//!
//! A run moves forward only:
//! `ConfigLoaded → Validated → Extracting → Resolving → Rendered → Summarized`.
//! There is no failure state; unit failures are diagnostics, and the two fatal
//! conditions are raised before a run exists.

use serde::Serialize;

use crate::error::PipelineError;

/// Phase of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunState {
    /// Task tables and source loaded
    ConfigLoaded,
    /// Skip plan computed
    Validated,
    /// Sheets being extracted
    Extracting,
    /// Paragraphs being resolved
    Resolving,
    /// Render attempted (successfully or not)
    Rendered,
    /// Diagnostics summarized
    Summarized,
}

impl RunState {
    /// All states in order
    pub const ALL: [Self; 6] = [
        Self::ConfigLoaded,
        Self::Validated,
        Self::Extracting,
        Self::Resolving,
        Self::Rendered,
        Self::Summarized,
    ];

    /// Check if no further transition exists
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Summarized)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RunState) -> Vec<RunState> {
    use RunState::{ConfigLoaded, Extracting, Rendered, Resolving, Summarized, Validated};
    match from {
        ConfigLoaded => vec![Validated],
        Validated => vec![Extracting],
        Extracting => vec![Resolving],
        Resolving => vec![Rendered],
        Rendered => vec![Summarized],
        Summarized => vec![],
    }
}

/// Validate a state transition
///
/// # Errors
/// [`PipelineError::IllegalTransition`] for anything but the next state.
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}
