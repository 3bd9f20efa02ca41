//! Insight generation pipeline.
//!
//! - [`FeatureExtractor`]: deterministic change features and severity
//! - [`AnomalyDetector`]: z-score, rolling-window and IQR tests
//! - [`InsightOrchestrator`]: model calls with retries and rule-based fallback
//! - [`BatchProcessor`]: independent processing of many requests

mod anomaly;
mod batch;
mod fallback;
mod features;
mod orchestrator;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use anomaly::AnomalyDetector;
pub use batch::{BatchFailure, BatchProcessor, BatchSummary};
pub use fallback::{generate_fallback_insight, FALLBACK_CONFIDENCE, FALLBACK_PROVENANCE_FINDING};
pub use features::{classify_severity, FeatureExtractor, ZERO_BASELINE_CHANGE_PERCENT};
pub use orchestrator::InsightOrchestrator;
pub use types::*;
