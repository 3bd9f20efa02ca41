//! # Metric Insights
//!
//! Turns a metric series, a time series or a block of free text into a
//! structured business insight: a short summary, a severity, a confidence
//! score, recommended actions and key findings.
//!
//! ## Features
//!
//! - **Feature Extraction**: Deterministic change and severity from the last two observations
//! - **Anomaly Detection**: Z-score, rolling-window and IQR tests on metric series
//! - **Model Providers**: Gemini, OpenAI and an offline mock behind one trait
//! - **Bounded Retries**: Failed attempts are retried with the failure appended to the prompt
//! - **Rule-Based Fallback**: Every valid request gets an insight, even with the model down
//! - **Batch Processing**: Independent, concurrency-limited processing of many requests
//!
//! ## Architecture
//!
//! ```text
//! InsightRequest → FeatureExtractor → AnomalyDetector → Prompt
//!                                                         ↓
//!          InsightResponse ← Validate / Fallback ← ModelClient (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use metric_insights::{build_client, Config, InsightOrchestrator, InsightRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = build_client(&config)?;
//!     let orchestrator = InsightOrchestrator::new(client, &config);
//!
//!     let request = InsightRequest::metrics("user-1", "tenant-1", "Revenue", vec![100.0, 150.0]);
//!     let response = orchestrator.generate_insight(&request).await?;
//!     println!("{}", response.insight.summary);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line commands for the `metric-insights` binary.
pub mod cli;
/// Configuration loaded from environment variables.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Feature extraction, anomaly detection and insight orchestration.
pub mod insights;
/// Generative model clients.
pub mod llm;
/// Prompt templates and the model response schema.
pub mod prompts;

pub use config::Config;
pub use error::{AppError, AppResult, InsightError, InsightResult};
pub use insights::{
    BatchProcessor, BatchSummary, InsightOrchestrator, InsightRequest, InsightResponse,
};
pub use llm::{build_client, ModelClient, ModelProvider};
