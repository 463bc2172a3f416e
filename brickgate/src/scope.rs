//! Orchestration for `brickgate scope`.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::scope::{ScopeVerdict, check_scope};
use crate::core::types::DetectMode;
use crate::exit_codes;
use crate::io::changes::detect_changes;
use crate::io::documents::read_contract;
use crate::io::paths::Workflow;
use crate::io::snapshot::write_snapshot;

/// Scope check result with the backend that produced the change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeReport {
    pub mode: DetectMode,
    pub verdict: ScopeVerdict,
}

impl ScopeReport {
    pub fn exit_code(&self) -> i32 {
        if self.verdict.is_ok() {
            exit_codes::OK
        } else {
            exit_codes::VIOLATION
        }
    }

    /// Lines the CLI prints on stdout.
    pub fn report_lines(&self) -> Vec<String> {
        match &self.verdict {
            ScopeVerdict::Ok => vec!["OK: all touched files are in spec FILES list".to_string()],
            ScopeVerdict::Violations(paths) => {
                let mut lines = vec!["OUT OF SCOPE FILES DETECTED:".to_string()];
                lines.extend(paths.iter().map(|path| format!("- {path}")));
                lines
            }
        }
    }
}

/// Compare the working tree's change set against the contract's FILES list.
///
/// A missing contract or baseline is an error, never a violation.
#[instrument(skip_all, fields(root = %workflow.paths.root.display()))]
pub fn run_scope_check(workflow: &Workflow) -> Result<ScopeReport> {
    let paths = &workflow.paths;
    let contract = read_contract(&paths.spec_path)?;
    let changes = detect_changes(paths)?;
    let verdict = check_scope(&changes.paths, &contract.allowed_files);
    info!(
        mode = changes.mode.as_str(),
        changed = changes.paths.len(),
        compliant = verdict.is_ok(),
        "scope checked"
    );
    Ok(ScopeReport {
        mode: changes.mode,
        verdict,
    })
}

/// Record the snapshot baseline; returns its root-relative path.
#[instrument(skip_all, fields(root = %workflow.paths.root.display()))]
pub fn snapshot_init(workflow: &Workflow) -> Result<String> {
    let paths = &workflow.paths;
    let count = write_snapshot(&paths.root, &paths.snapshot_path)
        .context("initialize snapshot baseline")?;
    info!(files = count, "snapshot baseline written");
    Ok(paths.display_rel(&paths.snapshot_path))
}
