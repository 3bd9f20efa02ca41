use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Insight error: {0}")]
    Insight(#[from] InsightError),

    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures raised while orchestrating a single insight.
///
/// Only [`InsightError::InvalidInput`] ever reaches callers of
/// `InsightOrchestrator::generate_insight`; every other variant is absorbed
/// into the rule-based fallback.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Model call failed: {0}")]
    ModelCall(#[from] LlmError),

    #[error("Model unavailable after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Model output failed validation: {message}")]
    OutputValidation { message: String },

    #[error("Unexpected failure: {message}")]
    Unexpected { message: String },

    #[error("Insight generation cancelled")]
    Cancelled,
}

impl InsightError {
    /// Shorthand for an [`InsightError::InvalidInput`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        InsightError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure is surfaced to the caller instead of falling back.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, InsightError::InvalidInput { .. })
    }
}

/// Generative model provider errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model call cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for insight orchestration
pub type InsightResult<T> = Result<T, InsightError>;

/// Result type alias for model provider calls
pub type LlmResult<T> = Result<T, LlmError>;
