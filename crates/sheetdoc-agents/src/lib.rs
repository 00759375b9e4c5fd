//! sheetdoc Agents - extraction, generation and completion providers
//!
//! Two narrow agent traits sit behind a name-keyed registry:
//! - [`Extractor`]: sheet table → raw `{field: value}` map
//! - [`Generator`]: prompt + nested context → paragraph text
//!
//! Both talk to a model only through [`CompletionService`]. The default
//! implementation, [`OpenAiCompatClient`], speaks the chat completions
//! protocol and is configured per provider from the environment.
//!
//! # Example
//!
//! ```rust
//! use sheetdoc_agents::{AgentRegistry, GenericExtractor};
//!
//! let registry = AgentRegistry::with_defaults();
//! assert!(registry.has_extractor(GenericExtractor::NAME));
//! ```

#![warn(unreachable_pub)]

// Agent modules
pub mod error;
pub mod extractor;
pub mod generator;
pub mod llm;
pub mod openai;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod schema;

// Re-exports for convenience
pub use error::{AgentError, Result};
pub use extractor::{Extractor, ExtractorInit, GenericExtractor};
pub use generator::{GenericParagraphGenerator, Generator, GeneratorInit};
pub use llm::CompletionService;
pub use openai::{OpenAiCompatClient, ProviderSettings};
pub use prompt::{template_engine, PromptTemplate};
pub use providers::{default_provider_from_env, ProviderRegistry, DEFAULT_PROVIDER, PROVIDER_ENV};
pub use registry::{AgentRegistry, ExtractorFactory, GeneratorFactory};
pub use schema::{ExtractionSchema, EXTRACT_FUNCTION};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sheetdoc agents
    pub use crate::{
        AgentError, AgentRegistry, CompletionService, ExtractionSchema, Extractor, ExtractorInit,
        Generator, GeneratorInit, ProviderRegistry,
    };
}
