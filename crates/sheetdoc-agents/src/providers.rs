//! Provider registry
//!
//! Maps a provider id to the completion service that answers for it. A
//! provider that could not be configured stays listed with its reason, so a
//! task naming it fails with that reason instead of "unknown provider".

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::llm::CompletionService;
use crate::openai::{OpenAiCompatClient, ProviderSettings};

/// Environment variable naming the default provider
pub const PROVIDER_ENV: &str = "LLM_PROVIDER";

/// Default provider when [`PROVIDER_ENV`] is unset
pub const DEFAULT_PROVIDER: &str = "openai";

/// Providers with built-in connection defaults
pub const BUILTIN_PROVIDERS: &[&str] = &["openai", "qwen"];

enum ProviderEntry {
    Ready(Arc<dyn CompletionService>),
    Unavailable(String),
}

/// Registry of completion providers
#[derive(Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<String, ProviderEntry>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("available", &self.available().collect::<Vec<_>>())
            .field("unavailable", &self.unavailable().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the built-in providers plus `extra` from the environment
    ///
    /// Providers whose settings are incomplete are registered as unavailable.
    #[must_use]
    pub fn from_env(extra: &[&str]) -> Self {
        let mut registry = Self::new();
        for id in BUILTIN_PROVIDERS.iter().chain(extra) {
            if registry.contains(id) {
                continue;
            }
            let built = ProviderSettings::from_env(id).and_then(|settings| {
                OpenAiCompatClient::new(settings).map_err(|e| e.to_string())
            });
            match built {
                Ok(client) => registry.register(id, Arc::new(client)),
                Err(reason) => {
                    tracing::debug!(provider = %id, %reason, "provider unavailable");
                    registry.mark_unavailable(id, reason);
                }
            }
        }
        registry
    }

    /// Register a ready provider
    pub fn register(&mut self, id: &str, service: Arc<dyn CompletionService>) {
        self.entries
            .insert(id.to_string(), ProviderEntry::Ready(service));
    }

    /// Record a provider that cannot be used, with the reason
    pub fn mark_unavailable(&mut self, id: &str, reason: impl Into<String>) {
        self.entries
            .insert(id.to_string(), ProviderEntry::Unavailable(reason.into()));
    }

    /// Builder-style register
    #[must_use]
    pub fn with(mut self, id: &str, service: Arc<dyn CompletionService>) -> Self {
        self.register(id, service);
        self
    }

    /// Check if provider is listed, usable or not
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up a usable provider
    ///
    /// # Errors
    /// - [`AgentError::UnknownProvider`] if `id` was never listed
    /// - [`AgentError::ProviderUnavailable`] if it could not be configured
    pub fn get(&self, id: &str) -> Result<Arc<dyn CompletionService>> {
        match self.entries.get(id) {
            Some(ProviderEntry::Ready(service)) => Ok(Arc::clone(service)),
            Some(ProviderEntry::Unavailable(reason)) => Err(AgentError::ProviderUnavailable {
                provider: id.to_string(),
                reason: reason.clone(),
            }),
            None => Err(AgentError::UnknownProvider(id.to_string())),
        }
    }

    /// Usable provider ids
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(id, e)| match e {
            ProviderEntry::Ready(_) => Some(id.as_str()),
            ProviderEntry::Unavailable(_) => None,
        })
    }

    /// Unusable provider ids with reasons
    pub fn unavailable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(id, e)| match e {
            ProviderEntry::Unavailable(reason) => Some((id.as_str(), reason.as_str())),
            ProviderEntry::Ready(_) => None,
        })
    }

    /// Get number of listed providers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default provider id from [`PROVIDER_ENV`]
#[must_use]
pub fn default_provider_from_env() -> String {
    std::env::var(PROVIDER_ENV)
        .ok()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
}
