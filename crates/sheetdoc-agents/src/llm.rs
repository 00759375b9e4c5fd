//! Completion service boundary
//!
//! The only seam between agents and a language model. Agents never see HTTP;
//! tests substitute a mock or a scripted service.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::ExtractionSchema;

/// A language model reachable through one provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Provider id, for logs
    fn provider(&self) -> &str;

    /// Ask for a structured result matching `schema`
    ///
    /// `Ok(None)` means the model answered without producing one.
    async fn complete_structured(
        &self,
        system_prompt: &str,
        schema: &ExtractionSchema,
    ) -> Result<Option<Map<String, Value>>>;

    /// Ask for free text
    async fn complete_text(&self, system_prompt: &str) -> Result<String>;
}
