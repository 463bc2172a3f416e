//! Workflow state storage (`state.json`) with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use super::atomic::write_json_atomic;
use crate::state::WorkflowState;

const STATE_SCHEMA: &str = include_str!("../../schemas/workflow_state.schema.json");

/// Load and validate the workflow state.
///
/// The whole document is read at once; a missing, unparsable or
/// schema-violating document is an error.
pub fn load_state(path: &Path) -> Result<WorkflowState> {
    debug!(path = %path.display(), "loading workflow state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read state {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse state {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("invalid state {}", path.display()))?;
    let state: WorkflowState = serde_json::from_value(value)
        .with_context(|| format!("deserialize state {}", path.display()))?;
    debug!(
        brick = %state.current_brick,
        status = state.status.as_str(),
        loop_count = state.loop_count,
        "workflow state loaded"
    );
    Ok(state)
}

/// Atomically write the whole workflow state (temp file + rename).
pub fn write_state(path: &Path, state: &WorkflowState) -> Result<()> {
    debug!(
        path = %path.display(),
        status = state.status.as_str(),
        loop_count = state.loop_count,
        "writing workflow state"
    );
    write_json_atomic(path, state).with_context(|| format!("write state {}", path.display()))
}

fn validate_schema(state: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(STATE_SCHEMA).context("parse state schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages = compiled
        .iter_errors(state)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(anyhow!(
            "state schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
