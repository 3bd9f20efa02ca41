use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use metric_insights::{
    cli::{execute_command, schema_output, CliResult, Commands},
    config::{Config, LogFormat, LoggingConfig},
};

/// Generate business insights from metrics, time series and text.
#[derive(Parser, Debug)]
#[command(name = "metric-insights", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = if cli.command.needs_model() {
        // Load configuration
        let config = match Config::from_env() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        };

        init_logging(&config.logging);

        info!(
            version = env!("CARGO_PKG_VERSION"),
            provider = %config.llm.provider,
            "Metric insights starting"
        );

        execute_command(cli.command, &config).await
    } else {
        init_logging(&LoggingConfig::default());
        schema_output()
    };

    finish(result)
}

fn finish(result: CliResult) -> anyhow::Result<()> {
    if result.exit_code == 0 {
        println!("{}", result.message);
        return Ok(());
    }

    error!(exit_code = result.exit_code, "Command failed");
    eprintln!("{}", result.message);
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
