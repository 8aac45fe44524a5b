// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entry Point
//!
//! Parses and validates CLI arguments, installs logging, races one
//! ingestion run against the shutdown signal handler, and maps the
//! outcome to a `sysexits`-style process exit code.

use adaptive_pipeline::infrastructure::config::LoggingConfig;
use adaptive_pipeline::infrastructure::logging;
use adaptive_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use adaptive_pipeline_bootstrap::{composition, config, result_to_exit_code};
use adaptive_pipeline_domain::error::PipelineError;
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match adaptive_pipeline_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(64); // EX_USAGE
        }
    };

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    } else if let Ok(settings) = config::load_settings(cli.config.as_deref()) {
        logging_config = settings.logging;
    }
    logging::init(&logging_config);

    result_to_exit_code(run(&cli).await)
}

async fn run(cli: &adaptive_pipeline_bootstrap::ValidatedCli) -> Result<(), PipelineError> {
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));

    tokio::select! {
        result = composition::run_ingestion(cli) => {
            result.map(|summary| {
                tracing::info!(fields = summary.fields.len(), files = summary.files.len(), "run complete");
            })
        }
        _ = adaptive_pipeline_bootstrap::signals::wait_for_shutdown_signal(&coordinator) => {
            Err(PipelineError::Cancelled("shutdown signal received".to_string()))
        }
    }
}
