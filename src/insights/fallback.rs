//! Rule-based insight used whenever the model path is unavailable or invalid.

use super::types::{FeatureSet, InsightOutput};

/// Confidence reported for rule-based insights.
pub const FALLBACK_CONFIDENCE: f64 = 0.60;

/// Finding that marks an insight as rule-based for downstream consumers.
pub const FALLBACK_PROVENANCE_FINDING: &str =
    "Analysis based on rule-based thresholds (LLM unavailable)";

/// Build a deterministic insight from the extracted features alone.
pub fn generate_fallback_insight(features: &FeatureSet, metric_name: &str) -> InsightOutput {
    let (direction, action_verb) = if features.change_percent > 0.0 {
        ("increase", "investigate the cause of this growth")
    } else {
        ("decrease", "identify factors driving this decline")
    };
    let magnitude = features.change_percent.abs();

    let summary = format!(
        "{} experienced a {:.1}% {} from {} to {}. This change has been classified as {} severity based on historical thresholds.",
        metric_name,
        magnitude,
        direction,
        features.previous_value,
        features.current_value,
        features.severity
    );

    InsightOutput {
        summary,
        severity: features.severity,
        confidence: FALLBACK_CONFIDENCE,
        recommended_actions: vec![
            format!(
                "Review {} data for the past 7 days to identify patterns",
                metric_name
            ),
            "Verify data quality and check for any anomalies in data collection".to_string(),
            format!("Consult with relevant teams to {}", action_verb),
        ],
        key_findings: vec![
            format!("{:.1}% change detected", magnitude),
            format!("Current value: {}", features.current_value),
            FALLBACK_PROVENANCE_FINDING.to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::Severity;
    use pretty_assertions::assert_eq;

    fn features(previous: f64, current: f64, percent: f64, severity: Severity) -> FeatureSet {
        FeatureSet {
            previous_value: previous,
            current_value: current,
            change_absolute: current - previous,
            change_percent: percent,
            severity,
        }
    }

    #[test]
    fn test_fallback_increase() {
        let insight =
            generate_fallback_insight(&features(100.0, 150.0, 50.0, Severity::Critical), "revenue");
        assert_eq!(
            insight.summary,
            "revenue experienced a 50.0% increase from 100 to 150. This change has been classified as critical severity based on historical thresholds."
        );
        assert_eq!(insight.severity, Severity::Critical);
        assert_eq!(insight.confidence, 0.60);
        assert_eq!(
            insight.recommended_actions[2],
            "Consult with relevant teams to investigate the cause of this growth"
        );
    }

    #[test]
    fn test_fallback_decrease() {
        let insight =
            generate_fallback_insight(&features(100.0, 80.0, -20.0, Severity::Medium), "signups");
        assert!(insight.summary.contains("20.0% decrease from 100 to 80"));
        assert_eq!(insight.key_findings[0], "20.0% change detected");
        assert_eq!(insight.key_findings[1], "Current value: 80");
        assert!(insight.recommended_actions[2].contains("decline"));
    }

    #[test]
    fn test_fallback_zero_change_reads_as_decrease() {
        let insight = generate_fallback_insight(&FeatureSet::zeroed(), "unknown");
        assert!(insight.summary.contains("0.0% decrease"));
        assert_eq!(insight.severity, Severity::Low);
    }

    #[test]
    fn test_fallback_shape_is_valid() {
        let insight =
            generate_fallback_insight(&features(10.0, 11.0, 10.0, Severity::Medium), "latency");
        assert_eq!(insight.recommended_actions.len(), 3);
        assert_eq!(insight.key_findings.len(), 3);
        assert!(insight.validate().is_ok());
    }

    #[test]
    fn test_fallback_declares_provenance() {
        let insight =
            generate_fallback_insight(&features(10.0, 11.0, 10.0, Severity::Medium), "latency");
        assert!(insight
            .key_findings
            .iter()
            .any(|f| f.contains("rule-based thresholds (LLM unavailable)")));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let f = features(3.0, 4.0, 33.33, Severity::High);
        assert_eq!(
            generate_fallback_insight(&f, "m"),
            generate_fallback_insight(&f, "m")
        );
    }
}
