//! vshort command-line entry point.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use vshort_worker::cli::is_help_or_version;
use vshort_worker::{logging, report_failure, Cli, PipelineError, StdioSink};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    logging::init().context("Failed to initialize tracing")?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if is_help_or_version(&e) => {
            e.print().context("Failed to print help")?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            report_failure(&StdioSink, &PipelineError::from(e));
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(audio = %cli.audio_url, parts = cli.parts, "Starting vshort");

    match vshort_worker::run(&cli, Arc::new(StdioSink)).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
