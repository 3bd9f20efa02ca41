//! Unit tests for insight request and response types.

use super::*;
use serde_json::json;

fn valid_output() -> InsightOutput {
    InsightOutput {
        summary: "Revenue rose sharply.".to_string(),
        severity: Severity::High,
        confidence: 0.8,
        recommended_actions: vec!["a".to_string(), "b".to_string()],
        key_findings: vec!["c".to_string(), "d".to_string()],
    }
}

// Severity tests
#[test]
fn test_severity_parse_and_display() {
    assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
    assert_eq!(Severity::Low.to_string(), "low");
    assert_eq!(
        "urgent".parse::<Severity>().unwrap_err(),
        "Unknown severity: urgent"
    );
}

#[test]
fn test_severity_serde_lowercase() {
    assert_eq!(serde_json::to_value(Severity::Medium).unwrap(), json!("medium"));
    let parsed: Severity = serde_json::from_value(json!("critical")).unwrap();
    assert_eq!(parsed, Severity::Critical);
}

#[test]
fn test_anomaly_method_parse() {
    assert_eq!("zscore".parse::<AnomalyMethod>().unwrap(), AnomalyMethod::ZScore);
    assert_eq!("rolling_std".parse::<AnomalyMethod>().unwrap(), AnomalyMethod::RollingStd);
    assert!("mad".parse::<AnomalyMethod>().is_err());
    assert_eq!(serde_json::to_value(AnomalyMethod::ZScore).unwrap(), json!("z_score"));
}

// InsightOutput tests
#[test]
fn test_output_validate_accepts_valid() {
    assert!(valid_output().validate().is_ok());
}

#[test]
fn test_output_validate_rejects_confidence_out_of_range() {
    let mut output = valid_output();
    output.confidence = 1.5;
    assert!(output.validate().unwrap_err().contains("confidence"));
}

#[test]
fn test_output_validate_rejects_list_lengths() {
    let mut output = valid_output();
    output.recommended_actions = vec!["only one".to_string()];
    assert!(output.validate().unwrap_err().contains("recommended_actions"));

    let mut output = valid_output();
    output.key_findings = (0..5).map(|i| i.to_string()).collect();
    assert!(output.validate().unwrap_err().contains("key_findings"));
}

#[test]
fn test_output_validate_rejects_blank_summary() {
    let mut output = valid_output();
    output.summary = "   ".to_string();
    assert!(output.validate().is_err());
}

#[test]
fn test_from_model_output_bad_severity() {
    let text = json!({
        "summary": "s",
        "severity": "extreme",
        "confidence": 0.5,
        "recommended_actions": ["a", "b"],
        "key_findings": ["c", "d"]
    })
    .to_string();
    let err = InsightOutput::from_model_output(&text).unwrap_err();
    assert!(matches!(err, crate::error::InsightError::OutputValidation { .. }));
}

// Request parsing tests
#[test]
fn test_parse_metrics_request() {
    let request = InsightRequest::metrics("u1", "t1", "Revenue", vec![1.0, 2.0, 3.0]);
    let input = request.parse_input().unwrap();
    assert_eq!(input.metric_name(), "Revenue");
    assert_eq!(input.data_points_count(), 3);
    assert_eq!(input.values(), Some(vec![1.0, 2.0, 3.0]));
    assert!(input.time_range().is_none());
}

#[test]
fn test_parse_rejects_empty_ids() {
    let request = InsightRequest::metrics(" ", "t1", "Revenue", vec![1.0, 2.0]);
    let err = request.parse_input().unwrap_err();
    assert_eq!(err.to_string(), "Invalid input: user_id - must not be empty");

    let request = InsightRequest::metrics("u1", "", "Revenue", vec![1.0, 2.0]);
    assert!(request.parse_input().unwrap_err().is_invalid_input());
}

#[test]
fn test_parse_rejects_wrong_shape() {
    let request = InsightRequest {
        user_id: "u".to_string(),
        tenant_id: "t".to_string(),
        input_type: InputType::Metrics,
        data: json!({"content": "not metrics"}),
        context: None,
    };
    let err = request.parse_input().unwrap_err();
    assert!(err.to_string().starts_with("Invalid input: data"));
}

#[test]
fn test_parse_text_request() {
    let input = InsightRequest::text("u", "t", "Churn is up").parse_input().unwrap();
    assert_eq!(input.metric_name(), "Text Analysis");
    assert_eq!(input.data_points_count(), 1);
    assert!(input.values().is_none());

    let err = InsightRequest::text("u", "t", "").parse_input().unwrap_err();
    assert!(err.is_invalid_input());
}

#[test]
fn test_parse_timeseries_request() {
    let request = InsightRequest {
        user_id: "u".to_string(),
        tenant_id: "t".to_string(),
        input_type: InputType::Timeseries,
        data: json!({
            "data_points": [
                {"timestamp": "2024-03-02T00:00:00Z", "value": 12.0},
                {"timestamp": "2024-03-01T00:00:00Z", "value": 10.0}
            ]
        }),
        context: None,
    };
    let input = request.parse_input().unwrap();
    assert_eq!(input.metric_name(), "Time Series");
    assert_eq!(input.values(), Some(vec![12.0, 10.0]));

    let range = input.time_range().unwrap();
    assert_eq!(range.start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    assert_eq!(range.end.to_rfc3339(), "2024-03-02T00:00:00+00:00");
}

#[test]
fn test_timestamps_without_offset_are_utc() {
    let request = InsightRequest {
        user_id: "u".to_string(),
        tenant_id: "t".to_string(),
        input_type: InputType::Metrics,
        data: json!({
            "metric_name": "Orders",
            "values": [10.0, 12.0],
            "timestamps": ["2024-12-10T00:00:00", "2024-12-11T06:30:00.250"]
        }),
        context: None,
    };
    let range = request.parse_input().unwrap().time_range().unwrap();
    assert_eq!(range.start.to_rfc3339(), "2024-12-10T00:00:00+00:00");
    assert_eq!(range.end.timestamp_millis() % 1000, 250);
}

#[test]
fn test_timestamps_with_offset_are_normalized() {
    let request = InsightRequest {
        user_id: "u".to_string(),
        tenant_id: "t".to_string(),
        input_type: InputType::Timeseries,
        data: json!({
            "data_points": [
                {"timestamp": "2024-12-10T02:00:00+02:00", "value": 1.0},
                {"timestamp": "2024-12-10T00:00:00", "value": 2.0},
                {"timestamp": "2024-12-10T01:00:00Z", "value": 3.0}
            ]
        }),
        context: None,
    };
    let range = request.parse_input().unwrap().time_range().unwrap();
    assert_eq!(range.start.to_rfc3339(), "2024-12-10T00:00:00+00:00");
    assert_eq!(range.end.to_rfc3339(), "2024-12-10T01:00:00+00:00");
}

#[test]
fn test_malformed_timestamp_is_invalid_input() {
    let mut request = InsightRequest::metrics("u", "t", "m", vec![1.0, 2.0]);
    request.data["timestamps"] = json!(["yesterday", "today"]);
    let err = request.parse_input().unwrap_err();
    assert!(err.is_invalid_input());
    assert!(err.to_string().contains("invalid timestamp 'yesterday'"));
}

#[test]
fn test_parse_timestamp_forms() {
    assert!(parse_timestamp("2024-12-10T00:00:00Z").is_ok());
    assert!(parse_timestamp("2024-12-10T00:00:00").is_ok());
    assert!(parse_timestamp("2024-12-10T00:00:00-05:00").is_ok());
    assert!(parse_timestamp("2024/12/10").is_err());
}

#[test]
fn test_blank_metric_name_uses_default() {
    let input = InsightRequest::metrics("u", "t", "  ", vec![1.0, 2.0])
        .parse_input()
        .unwrap();
    assert_eq!(input.metric_name(), "Unknown Metric");
}

#[test]
fn test_threshold_overrides_from_context() {
    let request = InsightRequest::metrics("u", "t", "m", vec![1.0, 2.0]).with_context(
        ContextConfig {
            baseline: None,
            thresholds: Some(ThresholdOverrides {
                critical: Some(80.0),
                ..Default::default()
            }),
        },
    );
    assert_eq!(request.threshold_overrides().unwrap().critical, Some(80.0));
    assert!(InsightRequest::text("u", "t", "x").threshold_overrides().is_none());
}

#[test]
fn test_request_deserializes_from_wire_json() {
    let request: InsightRequest = serde_json::from_value(json!({
        "user_id": "u1",
        "tenant_id": "t1",
        "input_type": "metrics",
        "data": {"metric_name": "Signups", "values": [10, 20]},
        "context": {"thresholds": {"high": 30}}
    }))
    .unwrap();
    assert_eq!(request.input_type, InputType::Metrics);
    assert_eq!(request.threshold_overrides().unwrap().high, Some(30.0));
}

#[test]
fn test_feature_set_finiteness() {
    assert!(FeatureSet::zeroed().is_finite());
    let mut features = FeatureSet::zeroed();
    features.change_absolute = f64::INFINITY;
    assert!(!features.is_finite());
}
