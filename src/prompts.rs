//! Prompt construction for insight generation
//!
//! This module renders extracted features into the model prompt and owns the
//! response schema sent with every model call. Keeping both here makes the
//! prompt/schema contract easy to review and version together.

use serde_json::json;

use crate::insights::{AnomalyResult, FeatureSet, InsightInput};

/// Task and output-format instructions appended to every insight prompt.
pub const INSIGHT_TASK_PROMPT: &str = r#"
TASK:
Generate a concise business insight explaining this change. Your response must be actionable and relevant to C-level stakeholders.

REQUIREMENTS:
1. Summary: 2-3 sentences explaining what happened and why it matters
2. Severity: critical | high | medium | low (you may adjust from rule-based if you have good reason)
3. Confidence: 0.0-1.0 based on data quality and pattern clarity
4. Recommended Actions: 2-4 specific, actionable steps
5. Key Findings: 2-4 bullet points highlighting important patterns

OUTPUT FORMAT: Return ONLY valid JSON matching this schema:
{
  "summary": "string",
  "severity": "critical|high|medium|low",
  "confidence": 0.85,
  "recommended_actions": ["action1", "action2"],
  "key_findings": ["finding1", "finding2"]
}

Generate your response now."#;

/// Build the insight prompt for one request.
///
/// The baseline line and the statistical anomaly section are only rendered
/// when given.
pub fn build_insight_prompt(
    metric_name: &str,
    features: &FeatureSet,
    input: &InsightInput,
    anomaly: Option<&AnomalyResult>,
    baseline: Option<f64>,
) -> String {
    let mut prompt = format!(
        "You are analyzing business metrics for an enterprise data platform.

METRIC: {}
CURRENT VALUE: {}
PREVIOUS VALUE: {}
CHANGE: {} ({:+.2}%)
RULE-BASED SEVERITY: {}
DATA POINTS: {}
",
        metric_name,
        features.current_value,
        features.previous_value,
        features.change_absolute,
        features.change_percent,
        features.severity,
        input.data_points_count(),
    );

    if let Some(baseline) = baseline {
        prompt.push_str(&format!("BASELINE: {}\n", baseline));
    }

    if let Some(anomaly) = anomaly {
        prompt.push_str(&format!(
            "
STATISTICAL ANOMALY ANALYSIS:
- Method: {}
- Is Anomaly: {}
- Z-Score: {:.2}
- Details: {}
",
            anomaly.method,
            anomaly.is_anomaly,
            anomaly.z_score,
            anomaly.interpretation().unwrap_or("N/A"),
        ));
    }

    prompt.push_str(INSIGHT_TASK_PROMPT);
    prompt
}

/// JSON schema of the expected model output.
///
/// Passed unchanged to every provider call so providers with structured
/// output support can enforce it.
pub fn response_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "Brief summary of the insight (2-3 sentences)"
            },
            "severity": {
                "type": "string",
                "enum": ["low", "medium", "high", "critical"],
                "description": "Severity level of the insight"
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "Confidence score between 0 and 1"
            },
            "recommended_actions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "List of 2-4 specific actionable steps",
                "minItems": 2,
                "maxItems": 4
            },
            "key_findings": {
                "type": "array",
                "items": { "type": "string" },
                "description": "List of 2-4 key findings",
                "minItems": 2,
                "maxItems": 4
            }
        },
        "required": ["summary", "severity", "confidence", "recommended_actions", "key_findings"]
    })
}

/// Note appended to the prompt after a failed attempt.
pub fn retry_amendment(error: &str) -> String {
    format!(
        "\n\nPREVIOUS ATTEMPT FAILED: {}\nEnsure output is valid JSON.",
        error
    )
}

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Raw JSON (fast path)
/// 2. ```json ... ``` code blocks
/// 3. ``` ... ``` code blocks
pub fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}
