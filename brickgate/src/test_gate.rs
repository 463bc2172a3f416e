//! Orchestration for `brickgate test`.
//!
//! Runs the context document's `TEST_COMMAND`, stores the combined output as
//! the test artifact, records the run in workflow state and appends a
//! handover entry. Every outcome, including a missing or unlaunchable
//! command, goes through the same record/state/handover path.

use std::io::ErrorKind;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::command_line::split_command_line;
use crate::core::failures::{detect_missing_tool, extract_failed_test_ids, short_reason};
use crate::core::state_update::apply_test_run;
use crate::core::types::{FailureKind, TestRunRecord, TestStatus};
use crate::exit_codes;
use crate::io::atomic::write_atomic;
use crate::io::documents::read_test_command;
use crate::io::handover::{HandoverEntry, TEST_GATE, append_entry};
use crate::io::paths::Workflow;
use crate::io::process::{CommandRunner, RunOutcome, SystemRunner};
use crate::io::workflow_state::{load_state, write_state};
use crate::state::WorkflowState;

/// Reason recorded in state when the context has no test command.
const MISSING_COMMAND_TOOL: &str = "TEST_COMMAND";

/// Result of one test gate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestGateOutcome {
    pub record: TestRunRecord,
    /// Short reason for a FAIL run, as written to the handover log.
    pub reason: Option<String>,
    pub failure: Option<FailureKind>,
    /// State after the run was recorded.
    pub state: WorkflowState,
    /// Process exit code for the CLI.
    pub exit_code: i32,
}

impl TestGateOutcome {
    /// Lines the CLI prints on stdout.
    pub fn report_lines(&self) -> Vec<String> {
        if self.record.command.is_empty() {
            let reason = self.reason.as_deref().unwrap_or_default();
            return vec![format!("{}: {reason}", self.record.status.as_str())];
        }
        vec![
            self.record.status.as_str().to_string(),
            format!("command: {}", self.record.command),
            format!("artifact: {}", self.record.artifact_path),
        ]
    }
}

/// Run the test gate with real child processes, as configured.
pub fn run_test_gate(workflow: &Workflow) -> Result<TestGateOutcome> {
    run_test_gate_with(workflow, &SystemRunner::from_config(&workflow.config.test))
}

/// How a test command attempt ended, before it is recorded.
struct Attempt {
    command: String,
    exit_code: i32,
    output: String,
    missing_tool: Option<String>,
    launch_failed: bool,
    /// Reason that overrides output-derived classification.
    fixed_reason: Option<(String, FailureKind)>,
}

/// Run the test gate through `runner`.
///
/// Only failures to read or write workflow documents are errors; everything
/// about the test command itself becomes a recorded outcome.
#[instrument(skip_all, fields(root = %workflow.paths.root.display()))]
pub fn run_test_gate_with<R: CommandRunner>(
    workflow: &Workflow,
    runner: &R,
) -> Result<TestGateOutcome> {
    let paths = &workflow.paths;
    let mut state = load_state(&paths.state_path)?;
    let artifact_path = paths.display_rel(&paths.test_output_path);

    let attempt = match read_test_command(&paths.context_path)? {
        None => missing_command(&paths.display_rel(&paths.context_path)),
        Some(command) => run_command(command, runner, workflow)?,
    };

    write_atomic(&paths.test_output_path, &attempt.output)
        .context("write test output artifact")?;

    let status = TestStatus::from_exit_code(attempt.exit_code);
    let (failed_test_ids, reason, failure) = match status {
        TestStatus::Pass => (Vec::new(), None, None),
        TestStatus::Fail => classify_failure(&attempt),
    };
    let record = TestRunRecord {
        command: attempt.command.clone(),
        status,
        exit_code: attempt.exit_code,
        artifact_path: artifact_path.clone(),
        failed_test_ids,
    };

    let state_reason = match failure {
        Some(FailureKind::Configuration) if attempt.command.is_empty() => {
            Some(short_reason(attempt.exit_code, &[], Some(MISSING_COMMAND_TOOL)))
        }
        _ => reason.clone(),
    };
    apply_test_run(&mut state, record.clone(), state_reason.as_deref());
    write_state(&paths.state_path, &state)?;

    let mut entry = HandoverEntry::new(TEST_GATE)
        .field("command", format!("`{}`", record.command))
        .field("status", status.as_str())
        .field("exit_code", record.exit_code.to_string());
    if let Some(reason) = &reason {
        entry = entry.field("reason", reason.clone());
    }
    entry = entry
        .field("artifact", format!("`{artifact_path}`"))
        .field("brick", state.current_brick.clone())
        .field("loop_count", state.loop_count.to_string());
    append_entry(&paths.handover_path, &entry)?;

    let exit_code = match status {
        TestStatus::Pass => exit_codes::OK,
        TestStatus::Fail => record.exit_code,
    };
    info!(
        status = status.as_str(),
        exit_code = record.exit_code,
        loop_count = state.loop_count,
        "test gate recorded"
    );
    Ok(TestGateOutcome {
        record,
        reason,
        failure,
        state,
        exit_code,
    })
}

fn missing_command(context_display: &str) -> Attempt {
    let message = format!("missing TEST_COMMAND in {context_display}");
    warn!("{message}");
    Attempt {
        command: String::new(),
        exit_code: exit_codes::CONFIG,
        output: format!("{message}\n"),
        missing_tool: None,
        launch_failed: false,
        fixed_reason: Some((message, FailureKind::Configuration)),
    }
}

fn run_command<R: CommandRunner>(
    command: String,
    runner: &R,
    workflow: &Workflow,
) -> Result<Attempt> {
    let argv = match split_command_line(&command) {
        Ok(argv) if !argv.is_empty() => argv,
        Ok(_) => return Ok(config_failure(command, "empty TEST_COMMAND".to_string())),
        Err(err) => {
            return Ok(config_failure(command, format!("invalid TEST_COMMAND: {err}")));
        }
    };

    let attempt = match runner.run(&argv, &workflow.paths.root)? {
        RunOutcome::LaunchFailed { program, kind, .. } if kind == ErrorKind::NotFound => Attempt {
            command,
            exit_code: exit_codes::NOT_FOUND,
            output: format!("tool not found: {program}\n"),
            missing_tool: Some(program),
            launch_failed: true,
            fixed_reason: None,
        },
        RunOutcome::LaunchFailed {
            program, message, ..
        } => Attempt {
            command,
            exit_code: exit_codes::NOT_RUNNABLE,
            output: format!("failed to launch {program}: {message}\n"),
            missing_tool: None,
            launch_failed: true,
            fixed_reason: None,
        },
        RunOutcome::Exited(run) => {
            let mut output = run.output;
            if run.truncated_bytes > 0 {
                output.push_str(&format!(
                    "\n[output truncated {} bytes]\n",
                    run.truncated_bytes
                ));
            }
            if run.timed_out {
                let secs = workflow.config.test.timeout_secs.unwrap_or_default();
                output.push_str(&format!("\n[test command timed out after {secs}s]\n"));
            }
            Attempt {
                command,
                exit_code: run.exit_code,
                output,
                missing_tool: None,
                launch_failed: false,
                fixed_reason: None,
            }
        }
    };
    Ok(attempt)
}

fn config_failure(command: String, message: String) -> Attempt {
    warn!("{message}");
    Attempt {
        command,
        exit_code: exit_codes::CONFIG,
        output: format!("{message}\n"),
        missing_tool: None,
        launch_failed: false,
        fixed_reason: Some((message, FailureKind::Configuration)),
    }
}

/// Failing ids, short reason and failure kind for a FAIL attempt.
fn classify_failure(attempt: &Attempt) -> (Vec<String>, Option<String>, Option<FailureKind>) {
    if let Some((reason, kind)) = &attempt.fixed_reason {
        return (Vec::new(), Some(reason.clone()), Some(*kind));
    }
    let failed_test_ids = extract_failed_test_ids(&attempt.output);
    let missing_tool = attempt
        .missing_tool
        .clone()
        .or_else(|| detect_missing_tool(&attempt.output));
    let kind = if attempt.launch_failed || missing_tool.is_some() {
        FailureKind::ExternalTool
    } else {
        FailureKind::Tests
    };
    let reason = short_reason(attempt.exit_code, &failed_test_ids, missing_tool.as_deref());
    (failed_test_ids, Some(reason), Some(kind))
}
