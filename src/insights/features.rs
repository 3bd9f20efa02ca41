//! Feature extraction: change and severity scoring for raw inputs.

use super::types::{FeatureSet, Severity, ThresholdOverrides};
use crate::config::SeverityThresholds;
use crate::error::{InsightError, InsightResult};

/// Sentinel percent change used when the previous value is zero.
pub const ZERO_BASELINE_CHANGE_PERCENT: f64 = 1000.0;

/// Words that mark a text input as urgent.
const URGENCY_KEYWORDS: [&str; 4] = ["urgent", "critical", "emergency", "immediate"];

/// Computes [`FeatureSet`]s from metric series and free text.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    thresholds: SeverityThresholds,
}

impl FeatureExtractor {
    /// Create an extractor with the configured default thresholds.
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    /// Default thresholds with any per-tier overrides applied.
    pub fn effective_thresholds(&self, overrides: Option<&ThresholdOverrides>) -> SeverityThresholds {
        let mut thresholds = self.thresholds;
        if let Some(o) = overrides {
            thresholds.critical = o.critical.unwrap_or(thresholds.critical);
            thresholds.high = o.high.unwrap_or(thresholds.high);
            thresholds.medium = o.medium.unwrap_or(thresholds.medium);
        }
        thresholds
    }

    /// Compare the last two values of a series.
    pub fn extract_from_metrics(
        &self,
        values: &[f64],
        overrides: Option<&ThresholdOverrides>,
    ) -> InsightResult<FeatureSet> {
        let [.., previous_value, current_value] = values else {
            return Err(InsightError::invalid(
                "values",
                "need at least 2 values for comparison",
            ));
        };
        let (previous_value, current_value) = (*previous_value, *current_value);
        let change_absolute = current_value - previous_value;

        let change_percent = if previous_value == 0.0 {
            if current_value == 0.0 {
                0.0
            } else if current_value > 0.0 {
                ZERO_BASELINE_CHANGE_PERCENT
            } else {
                -ZERO_BASELINE_CHANGE_PERCENT
            }
        } else {
            round2(change_absolute / previous_value * 100.0)
        };

        let thresholds = self.effective_thresholds(overrides);

        Ok(FeatureSet {
            previous_value,
            current_value,
            change_absolute,
            change_percent,
            severity: classify_severity(change_percent, &thresholds),
        })
    }

    /// Heuristic features for free text: word count and urgency keywords.
    pub fn extract_from_text(&self, text: &str) -> FeatureSet {
        let word_count = text.split_whitespace().count() as f64;
        let lowered = text.to_lowercase();
        let severity = if URGENCY_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            Severity::High
        } else {
            Severity::Medium
        };

        FeatureSet {
            previous_value: 0.0,
            current_value: word_count,
            change_absolute: word_count,
            change_percent: 0.0,
            severity,
        }
    }
}

/// Map |change%| onto a tier; boundaries belong to the higher tier.
pub fn classify_severity(change_percent: f64, thresholds: &SeverityThresholds) -> Severity {
    let magnitude = change_percent.abs();
    if magnitude >= thresholds.critical {
        Severity::Critical
    } else if magnitude >= thresholds.high {
        Severity::High
    } else if magnitude >= thresholds.medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
