//! Doctor command for checking an autobuy installation
//!
//! Verifies that the configuration validates, that the interpreter and agent
//! scripts the workflow launches exist, and that the audit log directory can
//! be written. Returns exit codes:
//! - 0: All checks passed
//! - 1: Some warnings detected
//! - 2: Errors detected

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_WARNING};
use anyhow::Result;
use autobuy::config::step_names;
use autobuy::WorkflowConfig;
use colored::*;
use std::path::{Path, PathBuf};

/// Status of a diagnostic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed without issues
    Ok,
    /// Check passed but with potential issues
    Warning,
    /// Check failed with errors
    Error,
}

/// One diagnostic result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub fix: Option<String>,
}

impl Check {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            fix: None,
        }
    }

    fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Accumulates check results and prints a summary
#[derive(Debug, Default)]
pub struct Doctor {
    checks: Vec<Check>,
}

impl Doctor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every check against the configuration at `config_path`, or the one found by search
    pub fn run_diagnostics(&mut self, config_path: Option<&Path>) -> Result<i32> {
        println!("{}", "autobuy doctor".bold().blue());
        println!();

        match WorkflowConfig::load(config_path) {
            Ok(config) => self.run_checks(&config),
            Err(e) => self.checks.push(
                Check::new("Configuration", CheckStatus::Error, e.to_string())
                    .with_fix("Fix or remove the configuration file"),
            ),
        }

        self.print_results();
        Ok(self.get_exit_code())
    }

    /// Check a loaded configuration
    pub fn run_checks(&mut self, config: &WorkflowConfig) {
        self.check_configuration(config);
        self.check_interpreter(&config.interpreter);
        self.check_scripts(config);
        self.check_log_dir(&config.log_dir);
    }

    fn check_configuration(&mut self, config: &WorkflowConfig) {
        let check = match config.validate() {
            Ok(()) if config.min_balance < config.planned_spend() => Check::new(
                "Configuration",
                CheckStatus::Warning,
                format!(
                    "minimum balance {} is below the planned spend {}",
                    config.min_balance,
                    config.planned_spend()
                ),
            )
            .with_fix("Raise AUTOBUY_MIN_BALANCE or min_balance in autobuy.yaml"),
            Ok(()) => Check::new("Configuration", CheckStatus::Ok, "valid"),
            Err(e) => Check::new("Configuration", CheckStatus::Error, e.to_string()),
        };
        self.checks.push(check);
    }

    fn check_interpreter(&mut self, interpreter: &Path) {
        let check = if interpreter.is_file() {
            Check::new(
                "Interpreter",
                CheckStatus::Ok,
                interpreter.display().to_string(),
            )
        } else {
            Check::new(
                "Interpreter",
                CheckStatus::Error,
                format!("{} not found", interpreter.display()),
            )
            .with_fix("Create the virtualenv or set AUTOBUY_PYTHON")
        };
        self.checks.push(check);
    }

    fn check_scripts(&mut self, config: &WorkflowConfig) {
        let mut required: Vec<(&str, PathBuf)> = vec![
            (step_names::BALANCE, config.script_path("balance.py")),
            (step_names::CHARGE, config.script_path("charge.py")),
        ];
        for kind in config.enabled_purchases() {
            required.push((kind.step_name(), config.script_path(kind.script())));
        }

        for (name, path) in required {
            self.push_script_check(name, &path, CheckStatus::Error);
        }

        // The login agent is only launched when requested
        let login_missing = if config.login_first {
            CheckStatus::Error
        } else {
            CheckStatus::Warning
        };
        self.push_script_check(
            step_names::LOGIN,
            &config.script_path("login.py"),
            login_missing,
        );
    }

    fn push_script_check(&mut self, name: &str, path: &Path, missing: CheckStatus) {
        let check_name = format!("Agent script '{name}'");
        let check = if path.is_file() {
            Check::new(check_name, CheckStatus::Ok, path.display().to_string())
        } else {
            Check::new(
                check_name,
                missing,
                format!("{} not found", path.display()),
            )
            .with_fix("Set AUTOBUY_SCRIPTS_DIR or scripts_dir in autobuy.yaml")
        };
        self.checks.push(check);
    }

    fn check_log_dir(&mut self, log_dir: &Path) {
        let check = match std::fs::metadata(log_dir) {
            Ok(meta) if !meta.is_dir() => Check::new(
                "Audit log directory",
                CheckStatus::Error,
                format!("{} is not a directory", log_dir.display()),
            ),
            Ok(meta) if meta.permissions().readonly() => Check::new(
                "Audit log directory",
                CheckStatus::Error,
                format!("{} is read-only", log_dir.display()),
            ),
            Ok(_) => Check::new(
                "Audit log directory",
                CheckStatus::Ok,
                log_dir.display().to_string(),
            ),
            Err(_) => Check::new(
                "Audit log directory",
                CheckStatus::Warning,
                format!("{} does not exist yet", log_dir.display()),
            )
            .with_fix("It is created on the first run"),
        };
        self.checks.push(check);
    }

    /// Results collected so far
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Print every check and the summary
    pub fn print_results(&self) {
        let use_color = crate::cli::Cli::should_use_color();
        for check in &self.checks {
            print_check(check, use_color);
        }
        println!();

        let count = |status| self.checks.iter().filter(|c| c.status == status).count();
        let (ok, warnings, errors) = (
            count(CheckStatus::Ok),
            count(CheckStatus::Warning),
            count(CheckStatus::Error),
        );
        if warnings == 0 && errors == 0 {
            println!("  All checks passed!");
        } else if use_color {
            println!(
                "  {} checks passed, {} warnings, {} errors",
                ok.to_string().green(),
                warnings.to_string().yellow(),
                errors.to_string().red()
            );
        } else {
            println!("  {ok} checks passed, {warnings} warnings, {errors} errors");
        }
    }

    /// Get exit code based on check results
    pub fn get_exit_code(&self) -> i32 {
        if self.checks.iter().any(|c| c.status == CheckStatus::Error) {
            EXIT_ERROR
        } else if self.checks.iter().any(|c| c.status == CheckStatus::Warning) {
            EXIT_WARNING
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Print a single check result
fn print_check(check: &Check, use_color: bool) {
    let (symbol, color_fn): (&str, fn(&str) -> ColoredString) = match check.status {
        CheckStatus::Ok => ("✓", |s: &str| s.green()),
        CheckStatus::Warning => ("⚠", |s: &str| s.yellow()),
        CheckStatus::Error => ("✗", |s: &str| s.red()),
    };

    if use_color {
        println!(
            "  {} {} - {}",
            color_fn(symbol),
            check.name.bold(),
            check.message
        );
    } else {
        println!("  {} {} - {}", symbol, check.name, check.message);
    }

    if let Some(fix) = &check.fix {
        println!("    → {fix}");
    }
}
