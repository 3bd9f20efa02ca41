use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{ChatCompletionRequest, ChatCompletionResponse, Message, ResponseFormat};
use super::{ensure_success, map_send_error, ModelClient, ModelProvider};
use crate::config::{ProviderConfig, RequestConfig};
use crate::error::{AppError, AppResult, LlmError, LlmResult};

/// Client for the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(config: &ProviderConfig, request_config: &RequestConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config {
                message: "OPENAI_API_KEY is required for the openai provider".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn system_prompt(schema: &serde_json::Value) -> String {
        let schema_text =
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        format!(
            "You are a data insights analyst. You must respond with valid JSON matching this schema:\n{}\n\nReturn ONLY valid JSON, no markdown formatting.",
            schema_text
        )
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f64,
        max_tokens: u32,
    ) -> LlmResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(Self::system_prompt(schema)),
                Message::user(prompt),
            ],
            temperature,
            max_tokens,
            response_format: ResponseFormat::json_object(),
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling OpenAI");
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_ms))?;

        let response = ensure_success(response).await?;

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse OpenAI response: {}", e),
                })?;

        let content = parsed
            .first_content()
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "No content in OpenAI response".to_string(),
            })?
            .to_string();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "OpenAI call succeeded"
        );

        Ok(content)
    }

    fn provider(&self) -> ModelProvider {
        ModelProvider::OpenAi
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
