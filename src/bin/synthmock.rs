//! synthmock CLI Binary
//!
//! Command-line entry point: mock server plus inspection commands.

use anyhow::{Context, Result};
use clap::Parser;
use synthmock::cli::{map_error, Cli, Commands, RunContext};
use synthmock::config::ConfigLoader;
use synthmock::logging::{init_logging, LoggingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;

    info!("synthmock starting");

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone(), cli.spec.clone())
        .map_err(|e| {
            error!("Error loading configuration: {}", e);
            anyhow::anyhow!(map_error(&e))
        })?;

    match context.execute(&cli.command).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(anyhow::anyhow!(map_error(&e)))
        }
    }
}

/// Build logging configuration from CLI args and the config file.
/// Inspection commands stay quiet unless --verbose is given.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let serving = matches!(cli.command, Commands::Serve { .. });
    if !cli.verbose && !serving {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut config = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path)
            .map(|c| c.logging)
            .unwrap_or_default(),
        None => ConfigLoader::load(&cli.workspace)
            .map(|c| c.logging)
            .unwrap_or_default(),
    };

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
