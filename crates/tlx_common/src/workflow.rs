//! Simulate -> confirm -> execute workflow
//!
//! A plan moves Built -> Simulated -> Executed (or Cancelled). The workflow
//! never crosses the confirmation gate on its own: the caller decides
//! whether `execute` runs after looking at the simulation.
//!
//! Every simulate/execute run is appended to the operation history when one
//! is attached. History writes are best-effort; a failed write is logged and
//! dropped so a broken store can never block an operation.

use crate::background::CancellationToken;
use crate::error::{Cancelled, PlanError};
use crate::history::{OperationHistory, OperationRecord, OperationStatus};
use crate::intent::{truncate_chars, Intent};
use crate::planner::{build_plan, Plan};
use crate::shell::{summarize_output, ShellResult, ShellRunner, DEFAULT_SUMMARY_LINES};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NOTHING_TO_SIMULATE: &str = "<nothing to simulate>";
pub const NO_EXECUTION_NEEDED: &str = "<no execution needed>";

/// Max characters of output summary stored per record
pub const STORED_SUMMARY_CHARS: usize = 200;
/// Max characters of stderr stored as the error message
pub const STORED_ERROR_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub plan: Arc<Plan>,
    pub result: Option<ShellResult>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub plan: Arc<Plan>,
    pub result: Option<ShellResult>,
    pub summary: String,
}

impl ExecutionResult {
    /// True when nothing ran or the real command exited 0
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().map(ShellResult::success).unwrap_or(true)
    }
}

/// Drives plans through the shell runner and records the outcome
pub struct Workflow {
    runner: Arc<dyn ShellRunner>,
    history: Option<Arc<OperationHistory>>,
    summary_lines: usize,
}

impl Workflow {
    pub fn new(runner: Arc<dyn ShellRunner>, history: Option<Arc<OperationHistory>>) -> Self {
        Self {
            runner,
            history,
            summary_lines: DEFAULT_SUMMARY_LINES,
        }
    }

    pub fn with_summary_lines(mut self, lines: usize) -> Self {
        self.summary_lines = lines.max(1);
        self
    }

    pub fn history(&self) -> Option<&Arc<OperationHistory>> {
        self.history.as_ref()
    }

    /// Run the simulate command, if the plan has one
    pub fn simulate(&self, plan: Arc<Plan>) -> SimulationResult {
        let Some(cmd) = plan.simulate_cmd.as_ref() else {
            debug!("No simulate command for {}", plan.intent);
            return SimulationResult {
                result: Some(ShellResult {
                    command: Vec::new(),
                    returncode: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                    simulated: true,
                }),
                plan,
                summary: NOTHING_TO_SIMULATE.to_string(),
            };
        };

        info!("Simulating: {}", cmd.join(" "));
        let mut result = self.runner.run(cmd);
        result.simulated = true;
        let summary = summarize_output(&result.stdout, &result.stderr, self.summary_lines);

        self.record(
            OperationRecord::new(plan.intent.as_str(), cmd.join(" "), OperationStatus::Simulated)
                .with_summary(truncate_chars(&summary, STORED_SUMMARY_CHARS)),
        );

        SimulationResult {
            plan,
            result: Some(result),
            summary,
        }
    }

    /// Run the real command, if the plan has one. Only call after the
    /// caller has confirmed.
    pub fn execute(&self, plan: Arc<Plan>) -> ExecutionResult {
        let Some(cmd) = plan.real_cmd.as_ref() else {
            debug!("No real command for {}", plan.intent);
            return ExecutionResult {
                plan,
                result: None,
                summary: NO_EXECUTION_NEEDED.to_string(),
            };
        };

        info!("Executing: {}", cmd.join(" "));
        let result = self.runner.run(cmd);
        let summary = summarize_output(&result.stdout, &result.stderr, self.summary_lines);

        let mut record = OperationRecord::new(
            plan.intent.as_str(),
            cmd.join(" "),
            if result.success() {
                OperationStatus::Success
            } else {
                OperationStatus::Failed
            },
        )
        .with_summary(truncate_chars(&summary, STORED_SUMMARY_CHARS));

        if !result.success() {
            warn!("Command failed with exit code {}: {}", result.returncode, cmd.join(" "));
            let error = if result.stderr.trim().is_empty() {
                format!("exit code {}", result.returncode)
            } else {
                truncate_chars(&result.stderr, STORED_ERROR_CHARS)
            };
            record = record.with_error(error);
        }
        self.record(record);

        ExecutionResult {
            plan,
            result: Some(result),
            summary,
        }
    }

    /// Log that the user declined (or the task was cancelled) before execution
    pub fn record_cancelled(&self, plan: &Plan) {
        let command = plan
            .display_real()
            .or_else(|| plan.display_simulate())
            .unwrap_or_default();
        info!("Operation cancelled: {}", command);
        self.record(OperationRecord::new(
            plan.intent.as_str(),
            command,
            OperationStatus::Cancelled,
        ));
    }

    /// Build, simulate and optionally execute in one call
    pub fn run_intent(
        &self,
        intent: &Intent,
        distro_id: Option<&str>,
        execute_real: bool,
    ) -> Result<(SimulationResult, Option<ExecutionResult>), PlanError> {
        let plan = Arc::new(build_plan(intent, distro_id)?);
        let sim = self.simulate(Arc::clone(&plan));
        let exe = (execute_real && plan.has_real_cmd()).then(|| self.execute(plan));
        Ok((sim, exe))
    }

    /// `run_intent` with a cancellation checkpoint before each shell phase.
    ///
    /// Cancellation between simulate and execute is recorded as a
    /// `cancelled` operation. Returns `Cancelled` (inside the anyhow error)
    /// when stopped at a checkpoint.
    pub fn run_intent_cancellable(
        &self,
        intent: &Intent,
        distro_id: Option<&str>,
        execute_real: bool,
        token: &CancellationToken,
    ) -> anyhow::Result<(SimulationResult, Option<ExecutionResult>)> {
        let plan = Arc::new(build_plan(intent, distro_id)?);

        token.check_cancelled()?;
        let sim = self.simulate(Arc::clone(&plan));

        if !(execute_real && plan.has_real_cmd()) {
            return Ok((sim, None));
        }

        if token.is_cancelled() {
            self.record_cancelled(&plan);
            return Err(Cancelled.into());
        }
        let exe = self.execute(plan);
        Ok((sim, Some(exe)))
    }

    // Best-effort: the failure stays scoped to this one write
    fn record(&self, record: OperationRecord) {
        let Some(history) = self.history.as_ref() else {
            return;
        };
        if let Err(e) = history.add(&record) {
            warn!("Failed to record operation in history: {:#}", e);
        }
    }
}
