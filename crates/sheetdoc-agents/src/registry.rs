//! Agent registry
//!
//! Provides [`AgentRegistry`], a plain map from agent name to constructor.
//! Every implementation is registered by an explicit call; an unknown name is
//! a lookup miss and fails only the unit that asked for it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::extractor::{Extractor, ExtractorInit, GenericExtractor};
use crate::generator::{GenericParagraphGenerator, Generator, GeneratorInit};

/// Extractor constructor
pub type ExtractorFactory = Arc<dyn Fn(ExtractorInit) -> Box<dyn Extractor> + Send + Sync>;

/// Generator constructor
pub type GeneratorFactory = Arc<dyn Fn(GeneratorInit) -> Box<dyn Generator> + Send + Sync>;

/// Registry of extractor and generator constructors
#[derive(Default, Clone)]
pub struct AgentRegistry {
    extractors: BTreeMap<String, ExtractorFactory>,
    generators: BTreeMap<String, GeneratorFactory>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AgentRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in agents
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_extractor(GenericExtractor::NAME, |init| {
            Box::new(GenericExtractor::new(init))
        });
        registry.register_generator(GenericParagraphGenerator::NAME, |init| {
            Box::new(GenericParagraphGenerator::new(init))
        });
        registry
    }

    /// Register an extractor constructor
    pub fn register_extractor<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(ExtractorInit) -> Box<dyn Extractor> + Send + Sync + 'static,
    {
        self.extractors.insert(name.to_string(), Arc::new(factory));
    }

    /// Register a generator constructor
    pub fn register_generator<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(GeneratorInit) -> Box<dyn Generator> + Send + Sync + 'static,
    {
        self.generators.insert(name.to_string(), Arc::new(factory));
    }

    /// Build an extractor by name
    ///
    /// # Errors
    /// [`AgentError::UnknownAgent`] if no extractor is registered as `name`.
    pub fn build_extractor(&self, name: &str, init: ExtractorInit) -> Result<Box<dyn Extractor>> {
        self.extractors
            .get(name)
            .map(|factory| factory(init))
            .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
    }

    /// Build a generator by name
    ///
    /// # Errors
    /// [`AgentError::UnknownAgent`] if no generator is registered as `name`.
    pub fn build_generator(&self, name: &str, init: GeneratorInit) -> Result<Box<dyn Generator>> {
        self.generators
            .get(name)
            .map(|factory| factory(init))
            .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
    }

    /// Check if an extractor exists
    #[inline]
    #[must_use]
    pub fn has_extractor(&self, name: &str) -> bool {
        self.extractors.contains_key(name)
    }

    /// Check if a generator exists
    #[inline]
    #[must_use]
    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Registered extractor names
    pub fn extractor_names(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(String::as_str)
    }

    /// Registered generator names
    pub fn generator_names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    /// Get number of registered agents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len() + self.generators.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty() && self.generators.is_empty()
    }
}
