//! Error types for sheetdoc agents
//!
//! Every variant here is confined to one unit of work: the orchestrator turns
//! it into a failed outcome for that sheet or paragraph and moves on.

use std::path::PathBuf;

use sheetdoc_core::CoreError;

/// Agent and provider errors
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No agent registered under this name
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    /// No provider registered under this id
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// Provider is known but could not be configured
    #[error("provider '{provider}' is unavailable: {reason}")]
    ProviderUnavailable {
        /// Provider id
        provider: String,
        /// Why it could not be configured
        reason: String,
    },

    /// Prompt file could not be read
    #[error("cannot read prompt {path}: {source}")]
    Prompt {
        /// Prompt path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Prompt template failed to render
    #[error("prompt template error: {0}")]
    Template(String),

    /// Sheet could not be turned into prompt text
    #[error(transparent)]
    Table(#[from] CoreError),

    /// Transport failure talking to the provider
    #[error("network error: {0}")]
    Network(String),

    /// Provider returned an error response
    #[error("api error: {0}")]
    Api(String),

    /// Provider response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Check if the error comes from the agent or provider lookup rather
    /// than from a call
    #[inline]
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgent(_) | Self::UnknownProvider(_) | Self::ProviderUnavailable { .. }
        )
    }

    /// Check if the error happened talking to the provider
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Api(_) | Self::InvalidResponse(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(AgentError::UnknownAgent("X".into()).is_lookup());
        assert!(AgentError::ProviderUnavailable {
            provider: "qwen".into(),
            reason: "DASHSCOPE_API_KEY not set".into()
        }
        .is_lookup());
        assert!(AgentError::Api("bad".into()).is_remote());
        assert!(!AgentError::Template("x".into()).is_remote());
    }

    #[test]
    fn unavailable_message_names_reason() {
        let err = AgentError::ProviderUnavailable {
            provider: "qwen".into(),
            reason: "DASHSCOPE_API_KEY not set".into(),
        };
        assert_eq!(
            err.to_string(),
            "provider 'qwen' is unavailable: DASHSCOPE_API_KEY not set"
        );
    }
}
