//! Test utilities for exercising the orchestrator without launching agents
//!
//! [`ScriptedRunner`] replays queued outcomes per step name and records every
//! step it is asked to run, in order.
//!
//! ```
//! use autobuy::test_utils::ScriptedRunner;
//!
//! let runner = ScriptedRunner::new()
//!     .succeed("balance", "Available Amount: 9,000 won")
//!     .fail("charge", 1, "keypad not recognised");
//! assert!(runner.invoked_names().is_empty());
//! ```

use crate::step::{Step, StepOutcome, StepRunner};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A [`StepRunner`] that returns canned outcomes
///
/// Steps without a queued outcome succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outcomes: Mutex<HashMap<String, VecDeque<StepOutcome>>>,
    invocations: Mutex<Vec<Step>>,
}

impl ScriptedRunner {
    /// Create a runner with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful outcome for `step`
    pub fn succeed(self, step: &str, captured_text: &str) -> Self {
        self.queue(
            step,
            StepOutcome::Success {
                captured_text: captured_text.to_string(),
            },
        )
    }

    /// Queue a failed outcome for `step`
    pub fn fail(self, step: &str, exit_code: i32, captured_text: &str) -> Self {
        self.queue(
            step,
            StepOutcome::Failure {
                exit_code,
                captured_text: captured_text.to_string(),
            },
        )
    }

    fn queue(self, step: &str, outcome: StepOutcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .entry(step.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Every step run so far, in order
    pub fn invocations(&self) -> Vec<Step> {
        self.invocations.lock().unwrap().clone()
    }

    /// Names of every step run so far, in order
    pub fn invoked_names(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|step| step.name)
            .collect()
    }

    /// How many times `step` ran
    pub fn count(&self, step: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == step)
            .count()
    }
}

#[async_trait]
impl StepRunner for ScriptedRunner {
    async fn run(&self, step: &Step) -> StepOutcome {
        self.invocations.lock().unwrap().push(step.clone());
        self.outcomes
            .lock()
            .unwrap()
            .get_mut(&step.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(StepOutcome::Success {
                captured_text: String::new(),
            })
    }
}
