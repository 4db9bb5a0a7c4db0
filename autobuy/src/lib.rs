//! # autobuy
//!
//! Unattended ticket purchasing: check the spendable balance, top it up when
//! it is below a threshold, then run each enabled purchase. Every external
//! action is an opaque agent process; this crate sequences them, reads the
//! balance out of their output, and keeps a daily audit log of the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autobuy::{AuditLog, Orchestrator, ProcessStepRunner, WorkflowConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkflowConfig::load(None)?;
//! config.validate()?;
//!
//! let audit = AuditLog::open(&config.log_dir)?;
//! let runner = ProcessStepRunner::new()
//!     .with_working_dir(&config.project_root)
//!     .with_environment(config.step_environment());
//!
//! let report = Orchestrator::new(&config, runner, &audit).run().await;
//! std::process::exit(report.exit_code());
//! # }
//! ```

#![warn(missing_docs)]

/// Date-partitioned audit log
pub mod audit;

/// Workflow configuration
pub mod config;

/// Environment variable helpers
pub mod env;

/// Error types and exit codes
pub mod error;

/// Amount extraction from agent output
pub mod extract;

/// Run sequencing and control flow
pub mod orchestrator;

/// External step execution
pub mod step;

/// Ticket types and purchase arguments
pub mod ticket;

/// Test doubles for the step runner
pub mod test_utils;

pub use audit::{AuditEntry, AuditLevel, AuditLog};
pub use config::{WorkflowConfig, YamlConfig};
pub use error::{AutobuyError, ConfigError, Result};
pub use extract::extract_amount;
pub use orchestrator::{Orchestrator, RunReport, RunState, WorkflowRun};
pub use step::{ProcessStepRunner, Step, StepOutcome, StepRunner};
pub use ticket::{Lotto645Mode, PurchaseKind};
