use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::types::{BrickStatus, TestRunRecord};

/// The single persisted workflow record (`state.json`).
///
/// Gates read the whole record, mutate selected fields and write the whole
/// record back. Keys this crate does not know about are carried through
/// untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub current_brick: String,
    #[serde(default)]
    pub status: BrickStatus,
    #[serde(default)]
    pub loop_count: u64,
    #[serde(default)]
    pub last_gate_failed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_run: Option<TestRunRecord>,
    #[serde(default)]
    pub completed_bricks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowState {
    pub fn new(current_brick: impl Into<String>) -> Self {
        Self {
            current_brick: current_brick.into(),
            ..Self::default()
        }
    }
}
