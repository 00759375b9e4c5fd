//! OpenAI-compatible chat completions client
//!
//! One client type serves every provider that speaks the chat completions
//! protocol (OpenAI itself, DashScope's compatible mode for Qwen, local
//! gateways). Providers differ only in [`ProviderSettings`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{AgentError, Result};
use crate::llm::CompletionService;
use crate::schema::ExtractionSchema;

// ============================================================================
// Constants
// ============================================================================

/// OpenAI API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI default model
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// DashScope API base URL (OpenAI compatible)
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Qwen default model
pub const QWEN_DEFAULT_MODEL: &str = "qwen-plus";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Security Utilities
// ============================================================================

/// Sanitize API error messages
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("api_key")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") {
        return "API rate limit exceeded. Please try again later.".to_string();
    }

    if error.len() < 200 {
        return error.to_string();
    }

    "An API error occurred. Please try again.".to_string()
}

/// Mask API key for safe display
fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for one provider
#[derive(Clone)]
pub struct ProviderSettings {
    /// Provider id
    pub id: String,
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Model
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("id", &self.id)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderSettings {
    /// Create settings
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read settings for `id` from the process environment
    ///
    /// # Errors
    /// Returns the reason the provider cannot be configured.
    pub fn from_env(id: &str) -> std::result::Result<Self, String> {
        Self::from_lookup(id, |name| std::env::var(name).ok())
    }

    /// Read settings for `id` through `lookup`
    ///
    /// Variables are `<ID>_API_KEY`, `<ID>_BASE_URL` and `<ID>_MODEL`.
    /// `openai` and `qwen` have built-in URLs and models; `qwen` also
    /// accepts `DASHSCOPE_API_KEY`. Other providers need a key and a URL.
    ///
    /// # Errors
    /// Returns the reason the provider cannot be configured.
    pub fn from_lookup<F>(id: &str, lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        let var = |suffix: &str| {
            lookup(&format!("{prefix}_{suffix}")).filter(|v| !v.trim().is_empty())
        };

        let (key_vars, default_url, default_model): (Vec<String>, Option<&str>, Option<&str>) =
            match id {
                "openai" => (
                    vec!["OPENAI_API_KEY".to_string()],
                    Some(OPENAI_BASE_URL),
                    Some(OPENAI_DEFAULT_MODEL),
                ),
                "qwen" => (
                    vec!["DASHSCOPE_API_KEY".to_string(), "QWEN_API_KEY".to_string()],
                    Some(DASHSCOPE_BASE_URL),
                    Some(QWEN_DEFAULT_MODEL),
                ),
                _ => (vec![format!("{prefix}_API_KEY")], None, None),
            };

        let api_key = key_vars
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| format!("{} not set", key_vars.join(" or ")))?;
        let base_url = var("BASE_URL")
            .or_else(|| default_url.map(str::to_string))
            .ok_or_else(|| format!("{prefix}_BASE_URL not set"))?;
        let model = var("MODEL")
            .or_else(|| default_model.map(str::to_string))
            .ok_or_else(|| format!("{prefix}_MODEL not set"))?;

        Ok(Self::new(id, api_key, base_url, model))
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Chat completions client for one provider
pub struct OpenAiCompatClient {
    client: Client,
    settings: ProviderSettings,
}

impl fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatClient {
    /// Create a client
    ///
    /// # Errors
    /// [`AgentError::Network`] if the HTTP client cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AgentError::Network(e.to_string()))?;
        Ok(Self { client, settings })
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn system_message(prompt: &str) -> ChatMessage {
        ChatMessage {
            role: "system".to_string(),
            content: Some(prompt.to_string()),
            tool_calls: None,
        }
    }

    /// Make API request
    async fn request(&self, body: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("{status}: {text}"));
            return Err(AgentError::Api(sanitize_api_error(&message)));
        }

        serde_json::from_str(&text).map_err(|e| AgentError::InvalidResponse(e.to_string()))
    }
}

/// First tool call's arguments as a JSON object
fn structured_result(response: ChatResponse) -> Result<Option<Map<String, Value>>> {
    let Some(call) = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls)
        .and_then(|calls| calls.into_iter().next())
    else {
        return Ok(None);
    };

    match serde_json::from_str::<Value>(&call.function.arguments) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(AgentError::InvalidResponse(format!(
            "{} arguments are not an object: {other}",
            call.function.name
        ))),
        Err(e) => Err(AgentError::InvalidResponse(format!(
            "{} arguments are not JSON: {e}",
            call.function.name
        ))),
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatClient {
    fn provider(&self) -> &str {
        &self.settings.id
    }

    #[instrument(skip(self, system_prompt, schema), fields(provider = %self.settings.id, model = %self.settings.model))]
    async fn complete_structured(
        &self,
        system_prompt: &str,
        schema: &ExtractionSchema,
    ) -> Result<Option<Map<String, Value>>> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![Self::system_message(system_prompt)],
            tools: Some(vec![schema.tool()]),
            tool_choice: Some(schema.tool_choice()),
        };
        debug!("sending structured completion request");
        let response = self.request(&request).await?;
        structured_result(response)
    }

    #[instrument(skip(self, system_prompt), fields(provider = %self.settings.id, model = %self.settings.model))]
    async fn complete_text(&self, system_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![Self::system_message(system_prompt)],
            tools: None,
            tool_choice: None,
        };
        debug!("sending text completion request");
        let response = self.request(&request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::InvalidResponse("no message content".to_string()))?;
        Ok(content.trim().to_string())
    }
}
