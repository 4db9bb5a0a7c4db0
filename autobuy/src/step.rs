//! Step definitions and the process-backed step runner
//!
//! A step is one opaque external action. It is launched once, its standard
//! output and standard error are merged into a single text stream in the
//! order lines arrive, and its exit status classifies the outcome.

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Exit code reported when a step could not be started or was killed by a signal
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// One external unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Identifier used in the audit log
    pub name: String,
    /// Executable to launch
    pub command: PathBuf,
    /// Arguments passed to the executable, in order
    pub arguments: Vec<OsString>,
}

impl Step {
    /// Create a step with no arguments
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Render the command line for logs
    pub fn command_line(&self) -> String {
        let mut line = self.command.display().to_string();
        for arg in &self.arguments {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Classified result of one step invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step exited with status 0
    Success {
        /// Merged stdout and stderr
        captured_text: String,
    },
    /// The step exited non-zero or could not be launched
    Failure {
        /// Exit status, or [`UNKNOWN_EXIT_CODE`]
        exit_code: i32,
        /// Merged stdout and stderr
        captured_text: String,
    },
}

impl StepOutcome {
    /// Whether the step succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }

    /// Output captured from the step, whatever the classification
    pub fn captured_text(&self) -> &str {
        match self {
            StepOutcome::Success { captured_text } => captured_text,
            StepOutcome::Failure { captured_text, .. } => captured_text,
        }
    }
}

/// Executes steps on behalf of the orchestrator
///
/// Implementations run exactly one attempt per call and never retry.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `step` to completion and classify its outcome
    async fn run(&self, step: &Step) -> StepOutcome;
}

/// Runs steps as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessStepRunner {
    /// Working directory for every child
    pub working_dir: Option<PathBuf>,
    /// Extra environment for every child
    pub environment: HashMap<String, String>,
}

impl ProcessStepRunner {
    /// Create a runner that inherits the current directory and environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for every child
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Add environment variables for every child
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment.extend(environment);
        self
    }

    fn command_for(&self, step: &Step) -> Command {
        let mut cmd = Command::new(&step.command);
        cmd.args(&step.arguments)
            .envs(&self.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl StepRunner for ProcessStepRunner {
    async fn run(&self, step: &Step) -> StepOutcome {
        tracing::debug!("Launching step '{}': {}", step.name, step.command_line());

        let mut child = match self.command_for(step).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to launch step '{}': {}", step.name, e);
                return StepOutcome::Failure {
                    exit_code: UNKNOWN_EXIT_CODE,
                    captured_text: format!("failed to launch {}: {}", step.command_line(), e),
                };
            }
        };

        let mut captured_text = String::new();
        let mut stdout = OutputStream::new(child.stdout.take());
        let mut stderr = OutputStream::new(child.stderr.take());

        // Partial lines survive a lost race in `pending`, so no bytes are dropped
        while stdout.is_open() || stderr.is_open() {
            let line = tokio::select! {
                line = stdout.next_line(), if stdout.is_open() => line,
                line = stderr.next_line(), if stderr.is_open() => line,
            };
            if let Some(line) = line {
                captured_text.push_str(&line);
                captured_text.push('\n');
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => {
                tracing::debug!("Step '{}' exited successfully", step.name);
                StepOutcome::Success { captured_text }
            }
            Ok(status) => {
                let exit_code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
                tracing::debug!("Step '{}' exited with {}", step.name, exit_code);
                StepOutcome::Failure {
                    exit_code,
                    captured_text,
                }
            }
            Err(e) => {
                captured_text.push_str(&format!("failed to wait for step: {e}\n"));
                StepOutcome::Failure {
                    exit_code: UNKNOWN_EXIT_CODE,
                    captured_text,
                }
            }
        }
    }
}

/// One piped output of a child, read line by line as raw bytes
struct OutputStream<R> {
    reader: Option<BufReader<R>>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputStream<R> {
    fn new(pipe: Option<R>) -> Self {
        Self {
            reader: pipe.map(BufReader::new),
            pending: Vec::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Next line with invalid UTF-8 replaced, closing the stream at EOF or on a read error
    ///
    /// Cancel safe: bytes read before the future is dropped stay in `pending`.
    async fn next_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        match reader.read_until(b'\n', &mut self.pending).await {
            Ok(0) if self.pending.is_empty() => {
                self.reader = None;
                None
            }
            Ok(_) => Some(self.take_pending()),
            Err(e) => {
                self.reader = None;
                let mut line = self.take_pending();
                if !line.is_empty() {
                    line.push('\n');
                }
                line.push_str(&format!("[output could not be read: {e}]"));
                Some(line)
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(name: &str, script: &str) -> Step {
        Step::new(name, "/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_step_builder() {
        let step = Step::new("charge", "/usr/bin/python3")
            .arg("charge.py")
            .args(["10000"]);
        assert_eq!(step.name, "charge");
        assert_eq!(step.arguments.len(), 2);
        assert_eq!(step.command_line(), "/usr/bin/python3 charge.py 10000");
        assert_eq!(step.to_string(), "charge");
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let runner = ProcessStepRunner::new();
        let outcome = runner.run(&sh("echo", "echo hello")).await;
        assert_eq!(
            outcome,
            StepOutcome::Success {
                captured_text: "hello\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure_with_output() {
        let runner = ProcessStepRunner::new();
        let outcome = runner
            .run(&sh("fail", "echo 'before failing'; exit 3"))
            .await;
        match outcome {
            StepOutcome::Failure {
                exit_code,
                captured_text,
            } => {
                assert_eq!(exit_code, 3);
                assert!(captured_text.contains("before failing"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_is_merged_into_captured_text() {
        let runner = ProcessStepRunner::new();
        let outcome = runner
            .run(&sh("mixed", "echo out; sleep 0.1; echo err 1>&2"))
            .await;
        assert!(outcome.is_success());
        assert_eq!(outcome.captured_text(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_missing_executable_is_failure() {
        let runner = ProcessStepRunner::new();
        let step = Step::new("ghost", "/nonexistent/autobuy-agent");
        let outcome = runner.run(&step).await;
        match outcome {
            StepOutcome::Failure {
                exit_code,
                captured_text,
            } => {
                assert_eq!(exit_code, UNKNOWN_EXIT_CODE);
                assert!(captured_text.contains("failed to launch"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_environment_and_working_dir_are_applied() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut env = HashMap::new();
        env.insert("AUTOBUY_TEST_VALUE".to_string(), "42".to_string());
        let runner = ProcessStepRunner::new()
            .with_working_dir(dir.path())
            .with_environment(env);

        let outcome = runner
            .run(&sh("env", "echo $AUTOBUY_TEST_VALUE; pwd"))
            .await;
        let text = outcome.captured_text();
        assert!(text.starts_with("42\n"));
        let canonical = dir.path().canonicalize().unwrap();
        assert!(text.contains(canonical.to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_stdin_is_closed() {
        let runner = ProcessStepRunner::new();
        let outcome = runner
            .run(&sh("stdin", "if read line; then echo got; else echo eof; fi"))
            .await;
        assert_eq!(outcome.captured_text(), "eof\n");
    }

    #[tokio::test]
    async fn test_invalid_utf8_keeps_reading_and_exit_status() {
        let runner = ProcessStepRunner::new();
        let outcome = runner
            .run(&sh(
                "balance",
                "printf 'bad \\377 byte\\n'; sleep 0.2; echo 'Available Amount: 15,000 won'",
            ))
            .await;
        assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");
        assert_eq!(
            outcome.captured_text(),
            "bad \u{FFFD} byte\nAvailable Amount: 15,000 won\n"
        );
        assert_eq!(
            crate::extract::extract_amount(outcome.captured_text()),
            Some(15000)
        );
    }

    #[tokio::test]
    async fn test_trailing_partial_line_is_kept() {
        let runner = ProcessStepRunner::new();
        let outcome = runner
            .run(&sh("partial", "printf 'first\\r\\nno newline'"))
            .await;
        assert_eq!(outcome.captured_text(), "first\nno newline\n");
    }
}
