use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{InsightError, InsightResult};

/// Severity tier derived from percent change, or assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// Deterministic summary of the change between the last two observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub previous_value: f64,
    pub current_value: f64,
    pub change_absolute: f64,
    pub change_percent: f64,
    pub severity: Severity,
}

impl FeatureSet {
    /// Placeholder features for responses where nothing usable was computed.
    pub fn zeroed() -> Self {
        Self {
            previous_value: 0.0,
            current_value: 0.0,
            change_absolute: 0.0,
            change_percent: 0.0,
            severity: Severity::Low,
        }
    }

    /// Whether every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.previous_value.is_finite()
            && self.current_value.is_finite()
            && self.change_absolute.is_finite()
            && self.change_percent.is_finite()
    }
}

/// Statistical test used to produce an [`AnomalyResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    ZScore,
    RollingStd,
    Iqr,
}

impl AnomalyMethod {
    /// Get the method name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyMethod::ZScore => "z_score",
            AnomalyMethod::RollingStd => "rolling_std",
            AnomalyMethod::Iqr => "iqr",
        }
    }
}

impl std::fmt::Display for AnomalyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AnomalyMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "z_score" | "zscore" => Ok(AnomalyMethod::ZScore),
            "rolling_std" => Ok(AnomalyMethod::RollingStd),
            "iqr" => Ok(AnomalyMethod::Iqr),
            _ => Err(format!("Unknown anomaly method: {}", s)),
        }
    }
}

/// Diagnostic key/value pairs attached to an anomaly result.
pub type AnomalyDetails = serde_json::Map<String, serde_json::Value>;

/// Outcome of one statistical anomaly test on the last value of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// For `iqr` this is a Gaussian-equivalent score, not a true z-score.
    pub z_score: f64,
    pub method: AnomalyMethod,
    pub details: AnomalyDetails,
}

impl AnomalyResult {
    /// Human-readable interpretation, when the test produced one.
    pub fn interpretation(&self) -> Option<&str> {
        self.details
            .get("interpretation")
            .and_then(serde_json::Value::as_str)
    }
}

/// Structured insight, produced by the model or by the rule-based fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightOutput {
    pub summary: String,
    pub severity: Severity,
    pub confidence: f64,
    pub recommended_actions: Vec<String>,
    pub key_findings: Vec<String>,
}

/// Allowed length range for actions and findings.
pub const INSIGHT_LIST_LEN: std::ops::RangeInclusive<usize> = 2..=4;

impl InsightOutput {
    /// Check the shape and range constraints shared by both production paths.
    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            ));
        }
        if !INSIGHT_LIST_LEN.contains(&self.recommended_actions.len()) {
            return Err(format!(
                "recommended_actions must have 2-4 items, got {}",
                self.recommended_actions.len()
            ));
        }
        if !INSIGHT_LIST_LEN.contains(&self.key_findings.len()) {
            return Err(format!(
                "key_findings must have 2-4 items, got {}",
                self.key_findings.len()
            ));
        }
        Ok(())
    }

    /// Parse and validate model output text.
    pub fn from_model_output(text: &str) -> InsightResult<Self> {
        let output: InsightOutput =
            serde_json::from_str(text).map_err(|e| InsightError::OutputValidation {
                message: e.to_string(),
            })?;
        output
            .validate()
            .map_err(|message| InsightError::OutputValidation { message })?;
        Ok(output)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Kind of payload carried by an [`InsightRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Metrics,
    Text,
    Timeseries,
}

/// Per-tier severity threshold overrides; missing tiers keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<f64>,
}

/// Optional caller-supplied analysis context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Reference level for the metric; shown to the model next to the features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdOverrides>,
}

/// Raw insight request as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRequest {
    pub user_id: String,
    pub tenant_id: String,
    pub input_type: InputType,
    /// Shape depends on `input_type`; checked by [`InsightRequest::parse_input`].
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextConfig>,
}

/// Metric series payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsData {
    #[serde(default)]
    pub metric_name: Option<String>,
    pub values: Vec<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamps",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamps: Option<Vec<DateTime<Utc>>>,
}

/// Free text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
}

/// One timestamped observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Timestamped series payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesData {
    #[serde(default)]
    pub series_name: Option<String>,
    pub data_points: Vec<TimeSeriesPoint>,
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()))
        .map_err(|_| format!("invalid timestamp '{}': expected ISO-8601", raw))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(de::Error::custom)
}

fn deserialize_optional_timestamps<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer)?
        .map(|items| items.iter().map(|raw| parse_timestamp(raw)).collect())
        .transpose()
        .map_err(de::Error::custom)
}

/// Typed request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightInput {
    Metrics(MetricsData),
    Text(TextData),
    Timeseries(TimeSeriesData),
}

impl InsightRequest {
    /// Create a metrics request.
    pub fn metrics(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        metric_name: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            input_type: InputType::Metrics,
            data: serde_json::json!({
                "metric_name": metric_name.into(),
                "values": values,
            }),
            context: None,
        }
    }

    /// Create a text request.
    pub fn text(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            input_type: InputType::Text,
            data: serde_json::json!({ "content": content.into() }),
            context: None,
        }
    }

    /// Set the analysis context
    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = Some(context);
        self
    }

    /// Validate `data` against `input_type` and convert it to a typed payload.
    pub fn parse_input(&self) -> InsightResult<InsightInput> {
        if self.user_id.trim().is_empty() {
            return Err(InsightError::invalid("user_id", "must not be empty"));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(InsightError::invalid("tenant_id", "must not be empty"));
        }

        let invalid = |e: serde_json::Error| {
            InsightError::invalid(
                "data",
                format!("invalid data format for {:?}: {}", self.input_type, e),
            )
        };

        match self.input_type {
            InputType::Metrics => {
                let data: MetricsData =
                    serde_json::from_value(self.data.clone()).map_err(invalid)?;
                if data.values.len() < 2 {
                    return Err(InsightError::invalid(
                        "data.values",
                        "need at least 2 values for comparison",
                    ));
                }
                Ok(InsightInput::Metrics(data))
            }
            InputType::Text => {
                let data: TextData = serde_json::from_value(self.data.clone()).map_err(invalid)?;
                if data.content.trim().is_empty() {
                    return Err(InsightError::invalid("data.content", "must not be empty"));
                }
                Ok(InsightInput::Text(data))
            }
            InputType::Timeseries => {
                let data: TimeSeriesData =
                    serde_json::from_value(self.data.clone()).map_err(invalid)?;
                if data.data_points.len() < 2 {
                    return Err(InsightError::invalid(
                        "data.data_points",
                        "need at least 2 data points for comparison",
                    ));
                }
                Ok(InsightInput::Timeseries(data))
            }
        }
    }

    /// Caller-supplied baseline, if any.
    pub fn baseline(&self) -> Option<f64> {
        self.context.as_ref().and_then(|c| c.baseline)
    }

    /// Threshold overrides from the request context, if any.
    pub fn threshold_overrides(&self) -> Option<&ThresholdOverrides> {
        self.context.as_ref().and_then(|c| c.thresholds.as_ref())
    }
}

impl InsightInput {
    /// Display name used in prompts, summaries and the response envelope.
    pub fn metric_name(&self) -> String {
        match self {
            InsightInput::Metrics(data) => data
                .metric_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Unknown Metric".to_string()),
            InsightInput::Text(_) => "Text Analysis".to_string(),
            InsightInput::Timeseries(data) => data
                .series_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Time Series".to_string()),
        }
    }

    /// Numeric series, for the inputs that carry one.
    pub fn values(&self) -> Option<Vec<f64>> {
        match self {
            InsightInput::Metrics(data) => Some(data.values.clone()),
            InsightInput::Text(_) => None,
            InsightInput::Timeseries(data) => {
                Some(data.data_points.iter().map(|p| p.value).collect())
            }
        }
    }

    /// Number of observations the insight is based on.
    pub fn data_points_count(&self) -> usize {
        match self {
            InsightInput::Metrics(data) => data.values.len(),
            InsightInput::Text(_) => 1,
            InsightInput::Timeseries(data) => data.data_points.len(),
        }
    }

    /// Earliest and latest supplied timestamp.
    pub fn time_range(&self) -> Option<TimeRange> {
        let timestamps: Vec<DateTime<Utc>> = match self {
            InsightInput::Metrics(data) => data.timestamps.clone().unwrap_or_default(),
            InsightInput::Text(_) => Vec::new(),
            InsightInput::Timeseries(data) => data.data_points.iter().map(|p| p.timestamp).collect(),
        };
        let start = timestamps.iter().min()?;
        let end = timestamps.iter().max()?;
        Some(TimeRange {
            start: *start,
            end: *end,
        })
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Time span covered by the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Short description of what was analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSummary {
    pub metric_name: String,
    pub data_points_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

/// Timing and provenance of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: u64,
    pub model_provider: String,
    pub model_version: String,
    /// True exactly when `insight` came from the rule-based path.
    pub fallback_used: bool,
}

/// Complete response envelope handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub insight_id: Uuid,
    pub user_id: String,
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    pub input_summary: InputSummary,
    pub features: FeatureSet,
    pub insight: InsightOutput,
    pub metadata: ResponseMetadata,
}
