use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::{ModelClient, ModelProvider};
use crate::error::LlmResult;
use crate::insights::Severity;

/// Offline model that returns a canned, schema-conforming insight.
///
/// Severity echoes the prompt's rule-based tier, so demos vary with the input.
#[derive(Debug, Clone)]
pub struct MockModelClient {
    model: String,
    latency: Duration,
}

impl MockModelClient {
    /// Create a mock client with no simulated latency
    pub fn new() -> Self {
        Self {
            model: "mock-llm-v1".to_string(),
            latency: Duration::ZERO,
        }
    }

    /// Simulate provider latency on every call
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency = Duration::from_millis(latency_ms);
        self
    }

    fn severity_for(prompt: &str) -> &'static str {
        let rule_based = prompt
            .lines()
            .find_map(|line| line.strip_prefix("RULE-BASED SEVERITY:"))
            .and_then(|tier| tier.trim().parse::<Severity>().ok());

        match rule_based {
            Some(severity) => severity.as_str(),
            None if prompt.to_lowercase().contains("spike") => "high",
            None => "medium",
        }
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
        _temperature: f64,
        _max_tokens: u32,
    ) -> LlmResult<String> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = json!({
            "summary": "Analysis indicates a notable trend change. The data shows significant movement that warrants attention from stakeholders.",
            "severity": Self::severity_for(prompt),
            "confidence": 0.85,
            "recommended_actions": [
                "Review recent operational changes that may have influenced this metric",
                "Monitor closely over the next 24-48 hours for trend confirmation",
                "Alert relevant team members to investigate root causes"
            ],
            "key_findings": [
                "Metric deviation exceeds typical variance thresholds",
                "Pattern suggests potential systematic change rather than noise",
                "Timing correlates with recent business events"
            ]
        });

        Ok(response.to_string())
    }

    fn provider(&self) -> ModelProvider {
        ModelProvider::Mock
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::InsightOutput;

    #[test]
    fn test_mock_output_is_valid_insight() {
        let client = MockModelClient::new();
        let text = tokio_test::block_on(client.generate("prompt", &json!({}), 0.7, 1000)).unwrap();
        let insight = InsightOutput::from_model_output(&text).unwrap();
        assert_eq!(insight.confidence, 0.85);
        assert_eq!(insight.recommended_actions.len(), 3);
    }

    #[test]
    fn test_mock_severity_follows_rule_based_line() {
        assert_eq!(
            MockModelClient::severity_for("METRIC: x\nRULE-BASED SEVERITY: critical\n"),
            "critical"
        );
        assert_eq!(MockModelClient::severity_for("RULE-BASED SEVERITY: low"), "low");
        assert_eq!(MockModelClient::severity_for("traffic spike"), "high");
        assert_eq!(MockModelClient::severity_for("steady state"), "medium");
    }

    #[tokio::test]
    async fn test_mock_severity_varies_with_full_prompt() {
        use crate::insights::{FeatureSet, InsightInput, TextData};
        use crate::prompts::build_insight_prompt;

        let input = InsightInput::Text(TextData {
            content: "ok".to_string(),
        });
        let client = MockModelClient::new();
        for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
            let features = FeatureSet {
                severity,
                ..FeatureSet::zeroed()
            };
            let prompt = build_insight_prompt("m", &features, &input, None, None);
            let text = client.generate(&prompt, &json!({}), 0.7, 100).await.unwrap();
            let insight = InsightOutput::from_model_output(&text).unwrap();
            assert_eq!(insight.severity, severity);
        }
    }

    #[tokio::test]
    async fn test_mock_simulated_latency() {
        let client = MockModelClient::new().with_latency_ms(20);
        let start = std::time::Instant::now();
        client.generate("p", &json!({}), 0.7, 10).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_mock_identity() {
        let client = MockModelClient::default();
        assert_eq!(client.provider(), ModelProvider::Mock);
        assert_eq!(client.model_name(), "mock-llm-v1");
    }
}
