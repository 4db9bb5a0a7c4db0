//! Command failures and the exit codes they end the process with
//!
//! A scheduler only sees the exit status, so every failure that leaves a
//! command is paired with the code for its class (see [`crate::exit_codes`]).

use autobuy::AutobuyError;
use std::error::Error;
use std::fmt;

/// Result of a CLI command
pub type CliResult<T> = Result<T, CliError>;

/// A failed command: what to print and which exit status to report
#[derive(Debug)]
pub struct CliError {
    /// Line printed after `Error: `
    pub message: String,
    /// Process exit status
    pub exit_code: i32,
    /// Underlying failure, walked for `Caused by:` lines
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// A failure described only by `message`
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// A failure whose message comes from `cause`, kept for its chain
    pub fn with_cause<E: Error + Send + Sync + 'static>(cause: E, exit_code: i32) -> Self {
        Self {
            message: cause.to_string(),
            exit_code,
            source: Some(Box::new(cause)),
        }
    }

    /// Message followed by one `Caused by:` line per deeper cause
    pub fn describe(&self) -> String {
        let mut text = self.message.clone();

        // The direct cause already supplied the message
        let mut cause = self.source().and_then(|e| e.source());
        while let Some(err) = cause {
            text.push_str(&format!("\n  Caused by: {err}"));
            cause = err.source();
        }

        text
    }
}

impl From<AutobuyError> for CliError {
    fn from(error: AutobuyError) -> Self {
        let exit_code = error.exit_code();
        Self::with_cause(error, exit_code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Attach an exit code to any error result
pub trait OrExit<T> {
    /// Turn the error into a [`CliError`] ending the process with `exit_code`
    fn or_exit(self, exit_code: i32) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> OrExit<T> for Result<T, E> {
    fn or_exit(self, exit_code: i32) -> CliResult<T> {
        self.map_err(|e| CliError::with_cause(e, exit_code))
    }
}

/// Exit status for a finished command; failures are printed to stderr
pub fn exit_code_for<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => crate::exit_codes::EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.describe());
            e.exit_code
        }
    }
}
