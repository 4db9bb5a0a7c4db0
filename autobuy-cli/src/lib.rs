//! autobuy CLI Library
//!
//! Command-line definitions, the `run` and `doctor` commands, and the exit
//! codes the binary reports to its scheduler.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// Installation diagnostics
pub mod doctor;
/// Error type carrying the process exit code
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// Diagnostic logging setup
pub mod logging;
/// The purchase workflow command
pub mod run;
