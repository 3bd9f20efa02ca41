use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use super::orchestrator::InsightOrchestrator;
use super::types::{InsightRequest, InsightResponse};
use crate::error::{InsightError, InsightResult};

/// One batch item that did not produce an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub error: String,
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Ids of the generated insights, in submission order
    pub insight_ids: Vec<Uuid>,
    pub failures: Vec<BatchFailure>,
    /// Generated insights, in submission order
    #[serde(default)]
    pub responses: Vec<InsightResponse>,
}

/// Runs many insight requests with bounded concurrency.
///
/// Every item runs on its own task, so a malformed item or a panic never
/// affects its siblings.
pub struct BatchProcessor {
    orchestrator: Arc<InsightOrchestrator>,
    concurrency: usize,
}

impl BatchProcessor {
    /// Create a batch processor; `concurrency` is clamped to at least 1.
    pub fn new(orchestrator: Arc<InsightOrchestrator>, concurrency: usize) -> Self {
        Self {
            orchestrator,
            concurrency: concurrency.max(1),
        }
    }

    /// Process raw request documents.
    pub async fn process(&self, items: Vec<serde_json::Value>) -> BatchSummary {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let orchestrator = Arc::clone(&self.orchestrator);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        InsightError::Unexpected {
                            message: e.to_string(),
                        }
                    })?;
                    process_item(&orchestrator, item).await
                })
            })
            .collect();

        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };

        for (index, handle) in handles.into_iter().enumerate() {
            let error = match handle.await {
                Ok(Ok(response)) => {
                    summary.successful += 1;
                    summary.insight_ids.push(response.insight_id);
                    summary.responses.push(response);
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(join_error) => format!("task failed: {}", join_error),
            };
            warn!(index, error = %error, "Batch item failed");
            summary.failed += 1;
            summary.failures.push(BatchFailure { index, error });
        }

        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "Batch completed"
        );

        summary
    }
}

async fn process_item(
    orchestrator: &InsightOrchestrator,
    item: serde_json::Value,
) -> InsightResult<InsightResponse> {
    let request: InsightRequest = serde_json::from_value(item)
        .map_err(|e| InsightError::invalid("request", e.to_string()))?;
    orchestrator.generate_insight(&request).await
}
