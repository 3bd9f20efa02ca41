use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::{ensure_success, map_send_error, ModelClient, ModelProvider};
use crate::config::{ProviderConfig, RequestConfig};
use crate::error::{AppError, AppResult, LlmError, LlmResult};

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &ProviderConfig, request_config: &RequestConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config {
                message: "GEMINI_API_KEY is required for the gemini provider".to_string(),
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

    /// Gemini has no separate system channel, so the schema rides along in the prompt.
    fn enhance_prompt(prompt: &str, schema: &serde_json::Value) -> String {
        let schema_text =
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        format!(
            "{}\n\nCRITICAL: You MUST respond with valid JSON matching this exact schema:\n{}\n\nReturn ONLY the JSON object, no markdown formatting, no explanations.",
            prompt, schema_text
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f64,
        max_tokens: u32,
    ) -> LlmResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest::json_prompt(
            Self::enhance_prompt(prompt, schema),
            temperature,
            max_tokens,
        );

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Gemini");
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_ms))?;

        let response = ensure_success(response).await?;

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse Gemini response: {}", e),
                })?;

        let text = parsed
            .first_text()
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "No content in Gemini response".to_string(),
            })?
            .to_string();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini call succeeded"
        );

        Ok(text)
    }

    fn provider(&self) -> ModelProvider {
        ModelProvider::Gemini
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            api_key: "test_key".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new(&config(), &RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://generativelanguage.googleapis.com");
        assert_eq!(client.model_name(), "gemini-2.5-flash-lite");
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = config();
        config.api_key = "  ".to_string();
        let result = GeminiClient::new(&config, &RequestConfig::default());
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_enhanced_prompt_carries_schema() {
        let schema = serde_json::json!({"type": "object"});
        let prompt = GeminiClient::enhance_prompt("Analyze revenue", &schema);
        assert!(prompt.starts_with("Analyze revenue"));
        assert!(prompt.contains("\"type\": \"object\""));
        assert!(prompt.ends_with("no markdown formatting, no explanations."));
    }
}
