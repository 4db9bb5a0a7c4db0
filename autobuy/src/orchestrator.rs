//! Workflow orchestration
//!
//! The orchestrator drives one run through a fixed pipeline:
//!
//! ```text
//! Start -> (SigningIn)? -> CheckingBalance -> (Funding)? -> Purchasing[i]... -> Done
//! ```
//!
//! Any failure moves the run to `Aborted`. Steps run strictly one at a time,
//! each outcome is written to the audit log before the next decision is made,
//! and a purchase never starts without a balance parsed from the balance
//! step's output.

use crate::audit::{AuditLevel, AuditLog};
use crate::config::{step_names, WorkflowConfig};
use crate::error::{AutobuyError, Result};
use crate::extract::extract_amount;
use crate::step::{Step, StepOutcome, StepRunner};
use crate::ticket::PurchaseKind;
use std::fmt;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, nothing invoked yet
    Start,
    /// Refreshing the login session
    SigningIn,
    /// Waiting on the balance agent
    CheckingBalance,
    /// Topping up the deposit
    Funding,
    /// Buying tickets of one kind
    Purchasing(PurchaseKind),
    /// Every enabled purchase succeeded
    Done,
    /// Stopped at the first failure
    Aborted,
}

impl RunState {
    /// Whether the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Start => f.write_str("start"),
            RunState::SigningIn => f.write_str("signing in"),
            RunState::CheckingBalance => f.write_str("checking balance"),
            RunState::Funding => f.write_str("funding"),
            RunState::Purchasing(kind) => write!(f, "purchasing {kind}"),
            RunState::Done => f.write_str("done"),
            RunState::Aborted => f.write_str("aborted"),
        }
    }
}

/// Mutable state of one run, owned by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    state: RunState,
    balance: Option<u64>,
    enabled: Vec<PurchaseKind>,
    funded: bool,
    purchased: Vec<PurchaseKind>,
}

impl WorkflowRun {
    fn new(enabled: Vec<PurchaseKind>) -> Self {
        Self {
            state: RunState::Start,
            balance: None,
            enabled,
            funded: false,
            purchased: Vec::new(),
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!("Run state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Balance parsed from the balance step, before any top-up
    pub fn balance(&self) -> Option<u64> {
        self.balance
    }

    /// Purchases enabled for this run, in order
    pub fn enabled(&self) -> &[PurchaseKind] {
        &self.enabled
    }

    /// Whether the funding step ran and succeeded
    pub fn funded(&self) -> bool {
        self.funded
    }

    /// Purchases that completed, in order
    pub fn purchased(&self) -> &[PurchaseKind] {
        &self.purchased
    }
}

/// Outcome of a run, successful or not
#[derive(Debug)]
pub struct RunReport {
    /// Final state of the run
    pub run: WorkflowRun,
    /// The failure that aborted the run
    pub error: Option<AutobuyError>,
}

impl RunReport {
    /// Whether the run reached `Done`
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        self.error
            .as_ref()
            .map_or(crate::error::EXIT_SUCCESS, AutobuyError::exit_code)
    }

    /// Convert into a `Result`, keeping the run on success
    pub fn into_result(self) -> Result<WorkflowRun> {
        match self.error {
            None => Ok(self.run),
            Some(e) => Err(e),
        }
    }
}

/// Sequences balance check, funding and purchases for one run
pub struct Orchestrator<'a, R: StepRunner> {
    config: &'a WorkflowConfig,
    runner: R,
    audit: &'a AuditLog,
}

impl<'a, R: StepRunner> Orchestrator<'a, R> {
    /// Create an orchestrator over a validated configuration
    pub fn new(config: &'a WorkflowConfig, runner: R, audit: &'a AuditLog) -> Self {
        Self {
            config,
            runner,
            audit,
        }
    }

    /// Execute one run to `Done` or `Aborted`
    pub async fn run(&self) -> RunReport {
        let mut run = WorkflowRun::new(self.config.enabled_purchases());

        match self.drive(&mut run).await {
            Ok(()) => {
                let summary = format!(
                    "run completed: balance {}, top-up {}, purchased {}",
                    run.balance.unwrap_or_default(),
                    if run.funded { "performed" } else { "skipped" },
                    join(&run.purchased)
                );
                let recorded = self.audit.record(AuditLevel::Info, summary);
                complete(run, recorded)
            }
            Err(error) => {
                let failed_in = run.state;
                run.transition(RunState::Aborted);
                let message = format!("run aborted while {failed_in}: {error}");
                if let Err(e) = self.audit.record(AuditLevel::Error, message) {
                    tracing::error!("Failed to record abort in audit log: {}", e);
                }
                RunReport {
                    run,
                    error: Some(error),
                }
            }
        }
    }

    async fn drive(&self, run: &mut WorkflowRun) -> Result<()> {
        self.audit.record(
            AuditLevel::Info,
            format!(
                "run started: purchases {}, minimum balance {}, top-up amount {}",
                join(&run.enabled),
                self.config.min_balance,
                self.config.top_up_amount
            ),
        )?;

        if self.config.login_first {
            run.transition(RunState::SigningIn);
            self.execute(&self.config.login_step()).await?;
        }

        run.transition(RunState::CheckingBalance);
        let output = self.execute(&self.config.balance_step()).await?;
        let balance = match extract_amount(&output) {
            Some(balance) => balance,
            None => {
                self.audit.record(
                    AuditLevel::Error,
                    format!(
                        "no amount found in output of '{}'; balance unknown, refusing to continue",
                        step_names::BALANCE
                    ),
                )?;
                return Err(AutobuyError::ExtractionFailure {
                    step: step_names::BALANCE.to_string(),
                });
            }
        };
        run.balance = Some(balance);

        if balance < self.config.min_balance {
            self.audit.record(
                AuditLevel::Info,
                format!(
                    "balance {} is below minimum {}; topping up by {}",
                    balance, self.config.min_balance, self.config.top_up_amount
                ),
            )?;
            run.transition(RunState::Funding);
            self.execute(&self.config.charge_step()).await?;
            run.funded = true;
        } else {
            self.audit.record(
                AuditLevel::Info,
                format!(
                    "balance {} meets minimum {}; no top-up needed",
                    balance, self.config.min_balance
                ),
            )?;
        }

        for kind in run.enabled.clone() {
            run.transition(RunState::Purchasing(kind));
            self.execute(&self.config.purchase_step(kind)).await?;
            run.purchased.push(kind);
        }

        Ok(())
    }

    /// Run one step and record its classification, returning its output on success
    async fn execute(&self, step: &Step) -> Result<String> {
        match self.runner.run(step).await {
            StepOutcome::Success { captured_text } => {
                self.audit.record_with_output(
                    AuditLevel::Info,
                    format!("step '{}' succeeded", step.name),
                    &captured_text,
                )?;
                Ok(captured_text)
            }
            StepOutcome::Failure {
                exit_code,
                captured_text,
            } => {
                self.audit.record_with_output(
                    AuditLevel::Error,
                    format!(
                        "step '{}' failed with exit code {} ({})",
                        step.name,
                        exit_code,
                        step.command_line()
                    ),
                    &captured_text,
                )?;
                Err(AutobuyError::StepFailure {
                    step: step.name.clone(),
                    exit_code,
                })
            }
        }
    }
}

/// Finish a run whose steps all succeeded; it is `Done` only once the summary is durable
fn complete(mut run: WorkflowRun, recorded: std::io::Result<()>) -> RunReport {
    match recorded {
        Ok(()) => {
            run.transition(RunState::Done);
            RunReport { run, error: None }
        }
        Err(e) => {
            tracing::error!("Failed to record run completion in audit log: {}", e);
            run.transition(RunState::Aborted);
            RunReport {
                run,
                error: Some(e.into()),
            }
        }
    }
}

fn join(kinds: &[PurchaseKind]) -> String {
    if kinds.is_empty() {
        return "none".to_string();
    }
    kinds
        .iter()
        .map(PurchaseKind::step_name)
        .collect::<Vec<_>>()
        .join(", ")
}
