//! Exit code constants for CLI commands
//!
//! The `run` command reports how the workflow ended:
//! - 0: Every enabled purchase succeeded
//! - 1: A step failed
//! - 2: Invalid configuration or flags (clap uses the same code for usage errors)
//! - 3: The balance could not be read
//! - 4: The audit log could not be written
//!
//! The `doctor` command reports 0, [`EXIT_WARNING`] or [`EXIT_ERROR`].

pub use autobuy::error::{
    EXIT_CONFIG_ERROR, EXIT_EXTRACTION_FAILURE, EXIT_IO_ERROR, EXIT_STEP_FAILURE, EXIT_SUCCESS,
};

/// Warnings found by `doctor`
pub const EXIT_WARNING: i32 = 1;

/// Errors found by `doctor`
pub const EXIT_ERROR: i32 = 2;
