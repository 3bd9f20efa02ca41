//! Generative model clients.
//!
//! The orchestrator only sees the [`ModelClient`] trait. Three implementations
//! are provided:
//! - [`GeminiClient`]: Google Gemini `generateContent` with JSON output
//! - [`OpenAiClient`]: OpenAI chat completions in JSON mode
//! - [`MockModelClient`]: offline, deterministic canned insights

mod gemini;
mod mock;
mod openai;
mod types;


pub use gemini::GeminiClient;
pub use mock::MockModelClient;
pub use openai::OpenAiClient;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, LlmConfig, RequestConfig};
use crate::error::{AppResult, LlmError, LlmResult};

/// Text generation capability consumed by the orchestrator.
///
/// On success the returned string *should* be JSON conforming to `schema`,
/// but callers must re-validate it. Implementations enforce their own
/// per-attempt timeout.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f64,
        max_tokens: u32,
    ) -> LlmResult<String>;

    /// Provider this client talks to.
    fn provider(&self) -> ModelProvider;

    /// Model identifier reported in response metadata.
    fn model_name(&self) -> String;
}

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Mock,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ModelProvider {
    /// Get the provider name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Mock => "mock",
            ModelProvider::Gemini => "gemini",
            ModelProvider::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ModelProvider::Mock),
            "gemini" => Ok(ModelProvider::Gemini),
            "openai" => Ok(ModelProvider::OpenAi),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

/// Construct the client selected by configuration.
pub fn build_client(config: &Config) -> AppResult<Arc<dyn ModelClient>> {
    build_client_from(&config.llm, &config.request)
}

/// Construct a client from its individual configuration sections.
pub fn build_client_from(
    llm: &LlmConfig,
    request: &RequestConfig,
) -> AppResult<Arc<dyn ModelClient>> {
    let client: Arc<dyn ModelClient> = match llm.provider {
        ModelProvider::Mock => Arc::new(MockModelClient::new().with_latency_ms(llm.mock_latency_ms)),
        ModelProvider::Gemini => Arc::new(GeminiClient::new(&llm.gemini, request)?),
        ModelProvider::OpenAi => Arc::new(OpenAiClient::new(&llm.openai, request)?),
    };
    Ok(client)
}

/// Map a transport failure, distinguishing timeouts.
///
/// The URL is dropped so error text never carries request details into logs
/// or retry prompts.
pub(crate) fn map_send_error(error: reqwest::Error, timeout_ms: u64) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout { timeout_ms }
    } else {
        LlmError::Http(error.without_url())
    }
}

/// Turn a non-2xx response into [`LlmError::Api`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> LlmResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        message: error_body,
    })
}
