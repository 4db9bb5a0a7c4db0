//! Run command implementation for the purchase workflow

use crate::cli::RunArgs;
use crate::error::{CliError, CliResult, OrExit};
use crate::exit_codes::{EXIT_CONFIG_ERROR, EXIT_IO_ERROR};
use autobuy::{AuditLevel, AuditLog, Orchestrator, ProcessStepRunner, WorkflowConfig};
use std::fmt::Display;
use std::path::Path;

/// Main entry point for the run command
pub async fn run_workflow_command(args: RunArgs) -> CliResult<()> {
    let config = load_config(&args)?;

    let audit = AuditLog::open(&config.log_dir).or_exit(EXIT_IO_ERROR)?;
    tracing::debug!("Recording run in {}", audit.path().display());

    let runner = ProcessStepRunner::new()
        .with_working_dir(&config.project_root)
        .with_environment(config.step_environment());

    let report = Orchestrator::new(&config, runner, &audit).run().await;
    match report.error {
        None => {
            tracing::info!("Purchase workflow finished");
            Ok(())
        }
        Some(error) => {
            let exit_code = error.exit_code();
            Err(CliError::new(
                format!("{error} (details in {})", audit.path().display()),
                exit_code,
            ))
        }
    }
}

/// Resolve and validate the configuration, recording rejections in the audit log
fn load_config(args: &RunArgs) -> CliResult<WorkflowConfig> {
    let mut config = match WorkflowConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let mut fallback = WorkflowConfig::from_env();
            args.apply_to(&mut fallback);
            record_rejection(&fallback.log_dir, &e);
            return Err(CliError::with_cause(e, EXIT_CONFIG_ERROR));
        }
    };
    args.apply_to(&mut config);

    if let Err(e) = config.validate() {
        record_rejection(&config.log_dir, &e);
        return Err(CliError::with_cause(e, EXIT_CONFIG_ERROR));
    }
    Ok(config)
}

/// Record a rejected invocation in today's audit log
///
/// The process is exiting with an error either way, so a log that cannot be
/// written is only reported through `tracing`.
pub fn record_rejection(log_dir: &Path, reason: &dyn Display) {
    let message = format!("configuration rejected: {reason}");
    match AuditLog::open(log_dir) {
        Ok(audit) => {
            if let Err(e) = audit.record(AuditLevel::Error, message) {
                tracing::warn!("Failed to write audit log: {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to open audit log in {}: {}", log_dir.display(), e),
    }
}

/// Record a command line clap rejected, using the log directory from the environment
pub fn record_usage_error(error: &clap::Error) {
    let rendered = error.to_string();
    let summary = rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("invalid command line");
    let config = WorkflowConfig::from_env();
    record_rejection(&config.log_dir, &summary);
}
