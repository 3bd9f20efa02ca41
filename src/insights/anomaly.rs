//! Statistical anomaly detection on the last value of a numeric series.
//!
//! Three independent tests are provided:
//! - **z-score**: distance of the last value from the mean of the whole series,
//!   in population standard deviations
//! - **rolling std**: distance of the last value from the mean of the `window`
//!   values immediately before it, in units of that window's standard deviation
//! - **IQR**: whether the last value falls outside the Tukey fences
//!   `[Q1 - m*IQR, Q3 + m*IQR]` of the whole series
//!
//! None of them fail. Short series and zero-variance series yield a
//! non-anomalous result with an `error` or `note` entry in `details`.
//!
//! # IQR score
//!
//! The IQR test has no native z-score. It reports a *Gaussian-equivalent*
//! score `|last - median| / (IQR / 1.35)`, using the fact that a normal
//! distribution's IQR is about 1.35 standard deviations. It is comparable in
//! scale to a z-score but is not one, and should not be mixed with the output
//! of [`AnomalyDetector::z_score_detection`].

use serde_json::json;

use super::types::{AnomalyDetails, AnomalyMethod, AnomalyResult};
use crate::config::AnomalyConfig;

/// IQR of a standard normal distribution, in standard deviations.
const GAUSSIAN_IQR_SCALE: f64 = 1.35;

/// Stateless statistical anomaly tests.
pub struct AnomalyDetector;

impl AnomalyDetector {
    /// Run the configured test with its configured parameters.
    pub fn detect(values: &[f64], config: &AnomalyConfig) -> AnomalyResult {
        match config.method {
            AnomalyMethod::ZScore => Self::z_score_detection(values, config.z_threshold),
            AnomalyMethod::RollingStd => Self::rolling_std_detection(
                values,
                config.rolling_window,
                config.rolling_threshold,
            ),
            AnomalyMethod::Iqr => Self::iqr_detection(values, config.iqr_multiplier),
        }
    }

    /// Z-score of the last value against the whole series (default threshold 3.0).
    pub fn z_score_detection(values: &[f64], threshold: f64) -> AnomalyResult {
        if values.len() < 3 {
            return not_anomalous(
                AnomalyMethod::ZScore,
                json!({ "error": "Insufficient data for z-score" }),
            );
        }

        let (mean, std) = mean_and_std(values);
        if std == 0.0 {
            return not_anomalous(
                AnomalyMethod::ZScore,
                json!({ "mean": mean, "std": 0.0, "note": "No variance in data" }),
            );
        }

        let current_value = values[values.len() - 1];
        let z_score = (current_value - mean) / std;
        let is_anomaly = z_score.abs() > threshold;

        AnomalyResult {
            is_anomaly,
            z_score,
            method: AnomalyMethod::ZScore,
            details: details(json!({
                "mean": mean,
                "std": std,
                "current_value": current_value,
                "threshold": threshold,
                "interpretation": format!(
                    "Value is {:.2} standard deviations from mean {}",
                    z_score.abs(),
                    verdict(is_anomaly)
                ),
            })),
        }
    }

    /// Deviation of the last value from the preceding `window` values
    /// (defaults: window 5, threshold 2.0).
    pub fn rolling_std_detection(values: &[f64], window: usize, threshold: f64) -> AnomalyResult {
        if window == 0 || values.len() < window + 1 {
            return not_anomalous(
                AnomalyMethod::RollingStd,
                json!({ "error": format!("Need at least {} values", window + 1) }),
            );
        }

        let last = values.len() - 1;
        let baseline = &values[last - window..last];
        let (rolling_mean, rolling_std) = mean_and_std(baseline);

        if rolling_std == 0.0 {
            return not_anomalous(
                AnomalyMethod::RollingStd,
                json!({
                    "rolling_mean": rolling_mean,
                    "rolling_std": 0.0,
                    "note": "No variance in rolling window",
                }),
            );
        }

        let current_value = values[last];
        let deviation = (current_value - rolling_mean).abs();
        let threshold_value = threshold * rolling_std;
        let is_anomaly = deviation > threshold_value;

        AnomalyResult {
            is_anomaly,
            z_score: deviation / rolling_std,
            method: AnomalyMethod::RollingStd,
            details: details(json!({
                "rolling_mean": rolling_mean,
                "rolling_std": rolling_std,
                "current_value": current_value,
                "deviation": deviation,
                "threshold_value": threshold_value,
                "window_size": window,
                "interpretation": format!(
                    "Value deviates by {:.2} (threshold: {:.2}) {}",
                    deviation,
                    threshold_value,
                    verdict(is_anomaly)
                ),
            })),
        }
    }

    /// Tukey-fence test on the last value (default multiplier 1.5).
    ///
    /// The reported `z_score` is the Gaussian-equivalent score described in
    /// the module docs, or 0 when the IQR is zero.
    pub fn iqr_detection(values: &[f64], multiplier: f64) -> AnomalyResult {
        if values.len() < 4 {
            return not_anomalous(
                AnomalyMethod::Iqr,
                json!({ "error": "Need at least 4 values for IQR" }),
            );
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let median = percentile(&sorted, 50.0);
        let iqr = q3 - q1;

        let lower_bound = q1 - multiplier * iqr;
        let upper_bound = q3 + multiplier * iqr;

        let current_value = values[values.len() - 1];
        let is_anomaly = current_value < lower_bound || current_value > upper_bound;

        let gaussian_equivalent = if iqr > 0.0 {
            (current_value - median).abs() / (iqr / GAUSSIAN_IQR_SCALE)
        } else {
            0.0
        };

        AnomalyResult {
            is_anomaly,
            z_score: gaussian_equivalent,
            method: AnomalyMethod::Iqr,
            details: details(json!({
                "q1": q1,
                "q3": q3,
                "iqr": iqr,
                "median": median,
                "lower_bound": lower_bound,
                "upper_bound": upper_bound,
                "current_value": current_value,
                "interpretation": format!(
                    "Value is {} normal range [{:.2}, {:.2}]",
                    if is_anomaly { "OUTSIDE" } else { "WITHIN" },
                    lower_bound,
                    upper_bound
                ),
            })),
        }
    }
}

fn not_anomalous(method: AnomalyMethod, info: serde_json::Value) -> AnomalyResult {
    AnomalyResult {
        is_anomaly: false,
        z_score: 0.0,
        method,
        details: details(info),
    }
}

fn details(value: serde_json::Value) -> AnomalyDetails {
    match value {
        serde_json::Value::Object(map) => map,
        _ => AnomalyDetails::new(),
    }
}

fn verdict(is_anomaly: bool) -> &'static str {
    if is_anomaly {
        "(ANOMALY)"
    } else {
        "(NORMAL)"
    }
}

/// Mean and population standard deviation.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Linear-interpolated percentile of an ascending, non-empty slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_score_normal_value() {
        let result = AnomalyDetector::z_score_detection(&[100.0, 105.0, 98.0, 102.0, 110.0], 3.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.method, AnomalyMethod::ZScore);
        assert!(result.z_score < 3.0);
        assert!(result.interpretation().unwrap().contains("(NORMAL)"));
    }

    #[test]
    fn test_z_score_short_series_is_bounded() {
        // Population z-scores in an n-element series never exceed sqrt(n - 1),
        // so a 5-point series cannot cross a 3.0 threshold however large the spike.
        let result = AnomalyDetector::z_score_detection(&[100.0, 105.0, 98.0, 102.0, 500.0], 3.0);
        assert!(result.z_score <= 2.0 + 1e-9);
        assert!(result.z_score > 1.99);
        assert!(!result.is_anomaly);

        let result = AnomalyDetector::z_score_detection(&[100.0, 105.0, 98.0, 102.0, 500.0], 1.5);
        assert!(result.is_anomaly);
    }

    #[test]
    fn test_z_score_anomaly() {
        let mut values = vec![
            100.0, 105.0, 98.0, 102.0, 101.0, 99.0, 103.0, 97.0, 100.0, 104.0, 102.0, 98.0, 101.0,
            99.0, 100.0,
        ];
        values.push(500.0);
        let result = AnomalyDetector::z_score_detection(&values, 3.0);
        assert!(result.is_anomaly);
        assert!(result.z_score > 3.0);
        assert_eq!(result.details["current_value"], 500.0);
        assert!(result.interpretation().unwrap().contains("(ANOMALY)"));
    }

    #[test]
    fn test_z_score_negative_direction() {
        let mut values = vec![100.0; 15];
        values[3] = 101.0;
        values.push(-400.0);
        let result = AnomalyDetector::z_score_detection(&values, 3.0);
        assert!(result.is_anomaly);
        assert!(result.z_score < -3.0);
    }

    #[test]
    fn test_z_score_insufficient_data() {
        let result = AnomalyDetector::z_score_detection(&[100.0, 105.0], 3.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.z_score, 0.0);
        assert!(result.details.contains_key("error"));
    }

    #[test]
    fn test_z_score_zero_std() {
        let result = AnomalyDetector::z_score_detection(&[100.0, 100.0, 100.0, 100.0], 3.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.z_score, 0.0);
        assert!(result.details["note"]
            .as_str()
            .unwrap()
            .contains("No variance"));
    }

    #[test]
    fn test_rolling_std_normal() {
        let result =
            AnomalyDetector::rolling_std_detection(&[100.0, 105.0, 110.0, 108.0, 112.0, 115.0], 5, 2.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.method, AnomalyMethod::RollingStd);
    }

    #[test]
    fn test_rolling_std_anomaly() {
        let result =
            AnomalyDetector::rolling_std_detection(&[100.0, 105.0, 110.0, 108.0, 112.0, 300.0], 5, 2.0);
        assert!(result.is_anomaly);
        assert_eq!(result.method, AnomalyMethod::RollingStd);
        // window [100, 105, 110, 108, 112]: mean 107
        assert_eq!(result.details["rolling_mean"], 107.0);
        assert_eq!(result.details["deviation"], 193.0);
        assert!(result.z_score > 2.0);
    }

    #[test]
    fn test_rolling_std_excludes_older_values_and_last() {
        // The early outlier lies outside the window and must not widen the baseline.
        let values = [10_000.0, 100.0, 101.0, 99.0, 100.0, 101.0, 130.0];
        let result = AnomalyDetector::rolling_std_detection(&values, 5, 2.0);
        assert!(result.is_anomaly);
        assert_eq!(result.details["window_size"], 5);
    }

    #[test]
    fn test_rolling_std_insufficient_data() {
        let result = AnomalyDetector::rolling_std_detection(&[1.0, 2.0, 3.0, 4.0, 5.0], 5, 2.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.details["error"], "Need at least 6 values");
    }

    #[test]
    fn test_rolling_std_zero_variance_window() {
        let result = AnomalyDetector::rolling_std_detection(&[5.0, 5.0, 5.0, 5.0, 5.0, 50.0], 5, 2.0);
        assert!(!result.is_anomaly);
        assert_eq!(result.z_score, 0.0);
        assert!(result.details.contains_key("note"));
    }

    #[test]
    fn test_iqr_detection_normal() {
        let values = [100.0, 105.0, 110.0, 108.0, 112.0, 115.0, 120.0, 118.0];
        let result = AnomalyDetector::iqr_detection(&values, 1.5);
        assert!(!result.is_anomaly);
        assert_eq!(result.method, AnomalyMethod::Iqr);
    }

    #[test]
    fn test_iqr_detection_outlier() {
        let values = [100.0, 105.0, 110.0, 108.0, 112.0, 115.0, 120.0, 500.0];
        let result = AnomalyDetector::iqr_detection(&values, 1.5);
        assert!(result.is_anomaly);
        assert_eq!(result.details["current_value"], 500.0);
        assert_eq!(result.details["q1"], 107.25);
        assert_eq!(result.details["q3"], 116.25);
        assert!(result.interpretation().unwrap().contains("OUTSIDE"));
    }

    #[test]
    fn test_iqr_gaussian_equivalent_score() {
        let values = [100.0, 105.0, 110.0, 108.0, 112.0, 115.0, 120.0, 500.0];
        let result = AnomalyDetector::iqr_detection(&values, 1.5);
        // median 111, IQR 9
        let expected = (500.0 - 111.0) / (9.0 / 1.35);
        assert!((result.z_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_iqr_zero_spread_scores_zero() {
        let result = AnomalyDetector::iqr_detection(&[7.0, 7.0, 7.0, 7.0, 9.0], 1.5);
        assert!(result.is_anomaly);
        assert_eq!(result.z_score, 0.0);
    }

    #[test]
    fn test_iqr_insufficient_data() {
        let result = AnomalyDetector::iqr_detection(&[1.0, 2.0, 3.0], 1.5);
        assert!(!result.is_anomaly);
        assert!(result.details.contains_key("error"));
    }

    #[test]
    fn test_detect_dispatches_on_configured_method() {
        let values = [100.0, 105.0, 110.0, 108.0, 112.0, 300.0];
        for method in [AnomalyMethod::ZScore, AnomalyMethod::RollingStd, AnomalyMethod::Iqr] {
            let config = AnomalyConfig {
                method,
                ..AnomalyConfig::default()
            };
            assert_eq!(AnomalyDetector::detect(&values, &config).method, method);
        }
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 50.0), 2.5);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
    }
}
