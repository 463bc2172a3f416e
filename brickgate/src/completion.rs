//! Orchestration for `brickgate state --complete`.
//!
//! The only path that can mark a brick COMPLETED or reset `loop_count`. It
//! requires the reviewer's verdict artifact to carry an exact
//! `Verdict: PASS` line; anything else sends the brick back to IN_PROGRESS.

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::state_update::{
    CompletionSummary, NEXT_ACTION_HINT, SKEPTIC_REJECTION, accept_completion,
    reject_completion,
};
use crate::exit_codes;
use crate::io::documents::has_pass_verdict;
use crate::io::handover::{COMPLETION_GATE, HandoverEntry, append_entry};
use crate::io::paths::Workflow;
use crate::io::workflow_state::{load_state, write_state};
use crate::state::WorkflowState;

/// Decision taken by the completion gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Rejected { state: WorkflowState },
    Completed {
        state: WorkflowState,
        summary: CompletionSummary,
    },
}

impl CompletionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            CompletionOutcome::Rejected { .. } => exit_codes::VIOLATION,
            CompletionOutcome::Completed { .. } => exit_codes::OK,
        }
    }

    /// Line the CLI prints on stdout.
    pub fn report_line(&self) -> String {
        match self {
            CompletionOutcome::Rejected { .. } => format!("REJECTED: {SKEPTIC_REJECTION}"),
            CompletionOutcome::Completed { .. } => "COMPLETED".to_string(),
        }
    }
}

/// Check the verdict, transition state and log the decision.
#[instrument(skip_all, fields(root = %workflow.paths.root.display()))]
pub fn run_completion_gate(workflow: &Workflow) -> Result<CompletionOutcome> {
    let paths = &workflow.paths;
    let mut state = load_state(&paths.state_path)?;

    if !has_pass_verdict(&paths.verdict_path)? {
        reject_completion(&mut state);
        write_state(&paths.state_path, &state)?;
        let entry = HandoverEntry::new(COMPLETION_GATE)
            .field("result", "REJECTED")
            .field("reason", SKEPTIC_REJECTION)
            .field("brick", state.current_brick.clone())
            .field("status", state.status.as_str())
            .field("loop_count", state.loop_count.to_string());
        append_entry(&paths.handover_path, &entry)?;
        info!(loop_count = state.loop_count, "completion rejected");
        return Ok(CompletionOutcome::Rejected { state });
    }

    let summary = accept_completion(&mut state);
    write_state(&paths.state_path, &state)?;
    let entry = HandoverEntry::new(COMPLETION_GATE)
        .field("result", "COMPLETED")
        .field("brick", summary.brick.clone())
        .field("status", state.status.as_str())
        .field("last_gate_failed", "null")
        .field("loop_count", state.loop_count.to_string())
        .field("next_action", NEXT_ACTION_HINT);
    append_entry(&paths.handover_path, &entry)?;
    info!(brick = %summary.brick, appended = summary.appended, "brick completed");
    Ok(CompletionOutcome::Completed { state, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BrickStatus;
    use crate::test_support::TempWorkflow;

    #[test]
    fn missing_verdict_rejects() {
        let wf = TempWorkflow::new("BRICK-7").expect("workflow");
        let mut state = wf.state().expect("state");
        state.status = BrickStatus::Completed;
        state.loop_count = 1;
        wf.write_state(&state).expect("seed");

        let outcome = run_completion_gate(&wf.workflow()).expect("gate");

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.report_line(), "REJECTED: SKEPTIC: verdict missing PASS");
        let state = wf.state().expect("state");
        assert_eq!(state.status, BrickStatus::InProgress);
        assert_eq!(state.loop_count, 2);
        assert_eq!(
            state.last_gate_failed.as_deref(),
            Some("SKEPTIC: verdict missing PASS")
        );
        assert_eq!(
            wf.handover(),
            "\n## COMPLETION GATE\n- result: REJECTED\n- reason: SKEPTIC: verdict missing PASS\n\
             - brick: BRICK-7\n- status: IN_PROGRESS\n- loop_count: 2\n"
        );
    }

    #[test]
    fn lowercase_verdict_rejects() {
        let wf = TempWorkflow::new("BRICK-7").expect("workflow");
        wf.write("skeptic_verdict.md", "verdict: pass\n").expect("verdict");

        let outcome = run_completion_gate(&wf.workflow()).expect("gate");

        assert!(matches!(outcome, CompletionOutcome::Rejected { .. }));
    }

    #[test]
    fn pass_verdict_completes_and_resets_loop() {
        let wf = TempWorkflow::new("BRICK-7").expect("workflow");
        let mut state = wf.state().expect("state");
        state.loop_count = 4;
        state.last_gate_failed = Some("TEST: failing nodeid a.py::b".to_string());
        wf.write_state(&state).expect("seed");
        wf.write("skeptic_verdict.md", "Findings: none\nVerdict: PASS\n")
            .expect("verdict");

        let outcome = run_completion_gate(&wf.workflow()).expect("gate");

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.report_line(), "COMPLETED");
        let state = wf.state().expect("state");
        assert_eq!(state.status, BrickStatus::Completed);
        assert_eq!(state.loop_count, 0);
        assert_eq!(state.last_gate_failed, None);
        assert_eq!(state.completed_bricks, vec!["BRICK-7".to_string()]);
        assert_eq!(state.next_action.as_deref(), Some(NEXT_ACTION_HINT));
        assert_eq!(
            wf.handover(),
            "\n## COMPLETION GATE\n- result: COMPLETED\n- brick: BRICK-7\n- status: COMPLETED\n\
             - last_gate_failed: null\n- loop_count: 0\n- next_action: Select and prepare next brick\n"
        );
    }

    #[test]
    fn completing_twice_lists_brick_once() {
        let wf = TempWorkflow::new("BRICK-7").expect("workflow");
        wf.write("skeptic_verdict.md", "Verdict: PASS\n").expect("verdict");

        run_completion_gate(&wf.workflow()).expect("first");
        let second = run_completion_gate(&wf.workflow()).expect("second");

        match second {
            CompletionOutcome::Completed { summary, .. } => assert!(!summary.appended),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(
            wf.state().expect("state").completed_bricks,
            vec!["BRICK-7".to_string()]
        );
    }
}
