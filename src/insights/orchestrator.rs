//! Insight orchestration.
//!
//! One request flows through feature extraction, optional anomaly detection,
//! prompt construction, bounded model attempts and output validation. Any
//! failure after input validation degrades to the rule-based fallback, so a
//! well-formed request always gets a complete [`InsightResponse`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::anomaly::AnomalyDetector;
use super::fallback::generate_fallback_insight;
use super::features::FeatureExtractor;
use super::types::{
    AnomalyResult, FeatureSet, InputSummary, InsightInput, InsightOutput, InsightRequest,
    InsightResponse, ResponseMetadata,
};
use crate::config::{AnomalyConfig, Config, RequestConfig, SeverityThresholds};
use crate::error::{InsightError, InsightResult};
use crate::llm::ModelClient;
use crate::prompts::{
    build_insight_prompt, extract_json_from_completion, response_schema, retry_amendment,
};

/// Minimum number of metric values before anomaly detection is attempted.
const MIN_ANOMALY_VALUES: usize = 3;

/// Produces insight responses for validated requests.
///
/// Holds only read-only settings and a shared client, so one instance can
/// serve any number of concurrent requests.
pub struct InsightOrchestrator {
    client: Arc<dyn ModelClient>,
    extractor: FeatureExtractor,
    anomaly: AnomalyConfig,
    request: RequestConfig,
}

/// Features and insight produced by one pass through the pipeline.
struct Outcome {
    features: FeatureSet,
    insight: InsightOutput,
    fallback_used: bool,
}

impl InsightOrchestrator {
    /// Create an orchestrator from application configuration.
    pub fn new(client: Arc<dyn ModelClient>, config: &Config) -> Self {
        Self::with_settings(
            client,
            config.severity,
            config.anomaly.clone(),
            config.request.clone(),
        )
    }

    /// Create an orchestrator from individual settings.
    pub fn with_settings(
        client: Arc<dyn ModelClient>,
        severity: SeverityThresholds,
        anomaly: AnomalyConfig,
        request: RequestConfig,
    ) -> Self {
        Self {
            client,
            extractor: FeatureExtractor::new(severity),
            anomaly,
            request,
        }
    }

    /// Generate an insight for one request.
    ///
    /// Only [`InsightError::InvalidInput`] is returned as an error.
    pub async fn generate_insight(
        &self,
        request: &InsightRequest,
    ) -> InsightResult<InsightResponse> {
        let start = Instant::now();

        let input = request.parse_input()?;
        let metric_name = input.metric_name();

        debug!(
            user_id = %request.user_id,
            tenant_id = %request.tenant_id,
            metric = %metric_name,
            "Generating insight"
        );

        let mut features_seen = None;
        let outcome = match self
            .run_pipeline(request, &input, &metric_name, &mut features_seen)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_invalid_input() => return Err(e),
            Err(e) => {
                error!(metric = %metric_name, error = %e, "Insight pipeline failed, using fallback");
                let features = features_seen
                    .filter(FeatureSet::is_finite)
                    .unwrap_or_else(FeatureSet::zeroed);
                Outcome {
                    insight: generate_fallback_insight(&features, &metric_name),
                    features,
                    fallback_used: true,
                }
            }
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        let response = InsightResponse {
            insight_id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            tenant_id: request.tenant_id.clone(),
            timestamp: Utc::now(),
            input_summary: InputSummary {
                metric_name,
                data_points_count: input.data_points_count(),
                time_range: input.time_range(),
            },
            features: outcome.features,
            insight: outcome.insight,
            metadata: ResponseMetadata {
                processing_time_ms,
                model_provider: self.client.provider().to_string(),
                model_version: self.client.model_name(),
                fallback_used: outcome.fallback_used,
            },
        };

        info!(
            insight_id = %response.insight_id,
            severity = %response.insight.severity,
            fallback_used = response.metadata.fallback_used,
            latency_ms = processing_time_ms,
            "Insight generated"
        );

        Ok(response)
    }

    /// Generate an insight unless `cancel` completes first.
    ///
    /// On cancellation the in-flight model call is dropped and
    /// [`InsightError::Cancelled`] is returned without a fallback.
    pub async fn generate_insight_until<F>(
        &self,
        request: &InsightRequest,
        cancel: F,
    ) -> InsightResult<InsightResponse>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.generate_insight(request) => result,
            _ = cancel => {
                warn!(user_id = %request.user_id, "Insight generation cancelled by caller");
                Err(InsightError::Cancelled)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &InsightRequest,
        input: &InsightInput,
        metric_name: &str,
        features_seen: &mut Option<FeatureSet>,
    ) -> InsightResult<Outcome> {
        let features = match input {
            InsightInput::Text(text) => self.extractor.extract_from_text(&text.content),
            _ => {
                let values = input.values().unwrap_or_default();
                self.extractor
                    .extract_from_metrics(&values, request.threshold_overrides())?
            }
        };
        *features_seen = Some(features.clone());

        if !features.is_finite() {
            return Err(InsightError::Unexpected {
                message: format!(
                    "non-finite features (previous {}, current {})",
                    features.previous_value, features.current_value
                ),
            });
        }

        let anomaly = self.detect_anomaly(input);
        let prompt = build_insight_prompt(
            metric_name,
            &features,
            input,
            anomaly.as_ref(),
            request.baseline(),
        );

        let insight = self
            .call_with_retry(&prompt)
            .await
            .and_then(|json| InsightOutput::from_model_output(&json));

        match insight {
            Ok(insight) => Ok(Outcome {
                features,
                insight,
                fallback_used: false,
            }),
            Err(e) => {
                warn!(metric = %metric_name, error = %e, "Model insight unusable, using fallback");
                Ok(Outcome {
                    insight: generate_fallback_insight(&features, metric_name),
                    features,
                    fallback_used: true,
                })
            }
        }
    }

    fn detect_anomaly(&self, input: &InsightInput) -> Option<AnomalyResult> {
        let InsightInput::Metrics(data) = input else {
            return None;
        };
        if data.values.len() < MIN_ANOMALY_VALUES {
            return None;
        }
        let result = AnomalyDetector::detect(&data.values, &self.anomaly);
        debug!(
            method = %result.method,
            is_anomaly = result.is_anomaly,
            z_score = result.z_score,
            "Anomaly detection completed"
        );
        Some(result)
    }

    /// Invoke the model until it returns parseable JSON or attempts run out.
    ///
    /// The prompt grows by one failure note per failed attempt.
    async fn call_with_retry(&self, prompt: &str) -> InsightResult<String> {
        let max_attempts = self.request.max_retries.max(1);
        let schema = response_schema();
        let mut prompt = prompt.to_string();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            match self.attempt(&prompt, &schema).await {
                Ok(json) => {
                    info!(
                        attempt,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Model call succeeded"
                    );
                    return Ok(json);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Model attempt failed");
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        prompt.push_str(&retry_amendment(&last_error));
                    }
                }
            }
        }

        Err(InsightError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    async fn attempt(&self, prompt: &str, schema: &serde_json::Value) -> InsightResult<String> {
        let text = self
            .client
            .generate(
                prompt,
                schema,
                self.request.temperature,
                self.request.max_tokens,
            )
            .await?;

        let json = extract_json_from_completion(&text)
            .map_err(|message| InsightError::OutputValidation { message })?;
        serde_json::from_str::<serde_json::Value>(json).map_err(|e| {
            InsightError::OutputValidation {
                message: format!("invalid JSON: {}", e),
            }
        })?;

        Ok(json.to_string())
    }
}
