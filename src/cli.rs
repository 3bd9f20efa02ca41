//! Command-line commands.
//!
//! Each command returns a [`CliResult`] instead of printing, so the binary
//! decides where output goes and tests can inspect it.

use std::io::Read;
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use crate::config::Config;
use crate::insights::{BatchProcessor, InsightOrchestrator, InsightRequest};
use crate::llm::build_client;
use crate::prompts::response_schema;

/// Input path meaning "read from stdin".
pub const STDIN_INPUT: &str = "-";

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate an insight for one request document
    Generate {
        /// Path to a JSON request, or `-` for stdin
        #[arg(long, short, default_value = STDIN_INPUT)]
        input: String,
    },

    /// Generate insights for a JSON array of request documents
    Batch {
        /// Path to a JSON array of requests, or `-` for stdin
        #[arg(long, short)]
        input: String,
    },

    /// Print the JSON schema the model must answer with
    Schema,
}

impl Commands {
    /// Whether the command talks to a model and therefore needs full configuration.
    pub fn needs_model(&self) -> bool {
        !matches!(self, Commands::Schema)
    }
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a CLI command.
pub async fn execute_command(command: Commands, config: &Config) -> CliResult {
    match command {
        Commands::Generate { input } => execute_generate(&input, config).await,
        Commands::Batch { input } => execute_batch(&input, config).await,
        Commands::Schema => schema_output(),
    }
}

/// Render the response schema.
pub fn schema_output() -> CliResult {
    to_json(&response_schema())
}

async fn execute_generate(input: &str, config: &Config) -> CliResult {
    let raw = match read_input(input).await {
        Ok(raw) => raw,
        Err(message) => return CliResult::error(message),
    };
    let request: InsightRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(e) => return CliResult::error(format!("Invalid request JSON: {}", e)),
    };

    let client = match build_client(config) {
        Ok(client) => client,
        Err(e) => return CliResult::error(e.to_string()),
    };
    let orchestrator = InsightOrchestrator::new(client, config);

    match orchestrator.generate_insight(&request).await {
        Ok(response) => to_json(&response),
        Err(e) => CliResult::error(e.to_string()),
    }
}

async fn execute_batch(input: &str, config: &Config) -> CliResult {
    let raw = match read_input(input).await {
        Ok(raw) => raw,
        Err(message) => return CliResult::error(message),
    };
    let items: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            return CliResult::error(format!("Batch input must be a JSON array: {}", e));
        }
    };

    let client = match build_client(config) {
        Ok(client) => client,
        Err(e) => return CliResult::error(e.to_string()),
    };
    let orchestrator = Arc::new(InsightOrchestrator::new(client, config));
    let summary = BatchProcessor::new(orchestrator, config.batch.concurrency)
        .process(items)
        .await;

    to_json(&summary)
}

async fn read_input(input: &str) -> Result<String, String> {
    if input == STDIN_INPUT {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buffer);
    }
    tokio::fs::read_to_string(input)
        .await
        .map_err(|e| format!("Failed to read {}: {}", input, e))
}

fn to_json<T: Serialize>(value: &T) -> CliResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CliResult::success(json),
        Err(e) => CliResult::error(format!("Failed to serialize output: {}", e)),
    }
}
