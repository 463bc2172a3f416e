//! Gate-owned transitions of the workflow record.
//!
//! `loop_count` only ever increases here, except in [`accept_completion`],
//! which is the single place that resets it and the single place that moves
//! a brick to `COMPLETED`.

use crate::core::failures::short_reason;
use crate::core::types::{BrickStatus, TestRunRecord, TestStatus};
use crate::state::WorkflowState;

/// Hint left for the external selector after a brick completes.
pub const NEXT_ACTION_HINT: &str = "Select and prepare next brick";

/// Tagged reason recorded when the completion gate rejects.
pub const SKEPTIC_REJECTION: &str = "SKEPTIC: verdict missing PASS";

/// What a completion acceptance changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSummary {
    pub brick: String,
    /// False when the brick was already listed (idempotent completion) or empty.
    pub appended: bool,
}

/// Record a test run. `reason` is the short failure reason for a FAIL run;
/// when absent, one is derived from the record.
///
/// Returns the tagged `last_gate_failed` value, if the run failed.
pub fn apply_test_run(
    state: &mut WorkflowState,
    record: TestRunRecord,
    reason: Option<&str>,
) -> Option<String> {
    let tagged = match record.status {
        TestStatus::Pass => None,
        TestStatus::Fail => {
            let reason = match reason {
                Some(reason) => reason.to_string(),
                None => short_reason(record.exit_code, &record.failed_test_ids, None),
            };
            Some(format!("TEST: {reason}"))
        }
    };
    if tagged.is_some() {
        state.loop_count = state.loop_count.saturating_add(1);
    }
    state.last_gate_failed = tagged.clone();
    state.last_test_run = Some(record);
    tagged
}

/// Completion rejected: back to in-progress and count the loop.
pub fn reject_completion(state: &mut WorkflowState) {
    state.status = BrickStatus::InProgress;
    state.last_gate_failed = Some(SKEPTIC_REJECTION.to_string());
    state.loop_count = state.loop_count.saturating_add(1);
}

/// Completion accepted: mark complete, reset the loop and record the brick once.
pub fn accept_completion(state: &mut WorkflowState) -> CompletionSummary {
    state.status = BrickStatus::Completed;
    state.last_gate_failed = None;
    state.loop_count = 0;

    let brick = state.current_brick.clone();
    let appended = !brick.is_empty() && !state.completed_bricks.contains(&brick);
    if appended {
        state.completed_bricks.push(brick.clone());
    }
    state.next_action = Some(NEXT_ACTION_HINT.to_string());
    CompletionSummary { brick, appended }
}
