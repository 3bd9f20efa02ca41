use std::env;

use crate::error::AppError;
use crate::insights::AnomalyMethod;
use crate::llm::ModelProvider;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub request: RequestConfig,
    pub severity: SeverityThresholds,
    pub anomaly: AnomalyConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Generative model provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ModelProvider,
    pub gemini: ProviderConfig,
    pub openai: ProviderConfig,
    /// Simulated latency for the offline mock provider
    pub mock_latency_ms: u64,
}

/// Credentials and endpoint for one hosted provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Per-request model invocation settings
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-attempt timeout, enforced by the HTTP client
    pub timeout_ms: u64,
    /// Total number of model attempts (not additional retries)
    pub max_retries: u32,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Percent-change thresholds for severity tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

/// Statistical anomaly detection settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyConfig {
    pub method: AnomalyMethod,
    pub z_threshold: f64,
    pub rolling_window: usize,
    pub rolling_threshold: f64,
    pub iqr_multiplier: f64,
}

/// Batch processing settings
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of orchestrations in flight at once
    pub concurrency: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig::from_env()?;

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let severity = SeverityThresholds::from_env();
        if !(severity.critical >= severity.high && severity.high >= severity.medium) {
            return Err(AppError::Config {
                message: format!(
                    "Severity thresholds must be ascending (medium {} <= high {} <= critical {})",
                    severity.medium, severity.high, severity.critical
                ),
            });
        }

        Ok(Config {
            llm,
            request: RequestConfig::from_env(),
            severity,
            anomaly: AnomalyConfig::from_env()?,
            batch: BatchConfig::from_env(),
            logging,
        })
    }
}

impl LlmConfig {
    /// Load provider selection and credentials from environment variables.
    ///
    /// The API key of the selected hosted provider is required.
    pub fn from_env() -> Result<Self, AppError> {
        let provider: ModelProvider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "gemini".to_string())
            .parse()
            .map_err(|message| AppError::Config { message })?;

        let gemini = ProviderConfig {
            api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-lite".to_string()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
        };

        let openai = ProviderConfig {
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
        };

        let required_key = match provider {
            ModelProvider::Gemini => Some(("GEMINI_API_KEY", &gemini.api_key)),
            ModelProvider::OpenAi => Some(("OPENAI_API_KEY", &openai.api_key)),
            ModelProvider::Mock => None,
        };
        if let Some((name, key)) = required_key {
            if key.trim().is_empty() {
                return Err(AppError::Config {
                    message: format!("{} is required when LLM_PROVIDER={}", name, provider),
                });
            }
        }

        Ok(Self {
            provider,
            gemini,
            openai,
            mock_latency_ms: env::var("MOCK_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }

    /// Configuration for the offline mock provider, used by tests and demos
    pub fn mock() -> Self {
        Self {
            provider: ModelProvider::Mock,
            gemini: ProviderConfig {
                api_key: String::new(),
                model: "gemini-2.5-flash-lite".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            openai: ProviderConfig {
                api_key: String::new(),
                model: "gpt-4-turbo-preview".to_string(),
                base_url: "https://api.openai.com".to_string(),
            },
            mock_latency_ms: 0,
        }
    }
}

impl RequestConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("LLM_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            temperature: env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .map(|t| t.clamp(0.0, 1.0))
                .unwrap_or(0.7),
            max_tokens: env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl SeverityThresholds {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            critical: env::var("SEVERITY_THRESHOLD_CRITICAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.critical),
            high: env::var("SEVERITY_THRESHOLD_HIGH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.high),
            medium: env::var("SEVERITY_THRESHOLD_MEDIUM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.medium),
        }
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 50.0,
            high: 25.0,
            medium: 10.0,
        }
    }
}

impl AnomalyConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let method = match env::var("ANOMALY_METHOD") {
            Ok(raw) => raw
                .parse::<AnomalyMethod>()
                .map_err(|message| AppError::Config { message })?,
            Err(_) => defaults.method,
        };

        Ok(Self {
            method,
            z_threshold: env::var("ANOMALY_Z_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.z_threshold),
            rolling_window: env::var("ANOMALY_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|w: &usize| *w > 0)
                .unwrap_or(defaults.rolling_window),
            rolling_threshold: env::var("ANOMALY_ROLLING_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rolling_threshold),
            iqr_multiplier: env::var("ANOMALY_IQR_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.iqr_multiplier),
        })
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            method: AnomalyMethod::ZScore,
            z_threshold: 3.0,
            rolling_window: 5,
            rolling_threshold: 2.0,
            iqr_multiplier: 1.5,
        }
    }
}

impl BatchConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self {
            concurrency: env::var("BATCH_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|c: &usize| *c > 0)
                .unwrap_or(4),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
