//! `brickgate packet`: assemble the reviewer packet.
//!
//! The packet holds a copy of the brick contract, a fresh test run, an
//! excerpt of the workflow state after that run, and a diff of the working
//! tree. Exactly one of `diff.patch` (git) or `diff.txt` (otherwise) exists
//! afterwards.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::types::DetectMode;
use crate::io::atomic::{write_atomic, write_json_atomic};
use crate::io::changes::{ChangeSetSource, SnapshotChangeSource, detect_mode};
use crate::io::git::Git;
use crate::io::paths::{GatePaths, Workflow};
use crate::io::process::CommandRunner;
use crate::test_gate::run_test_gate_with;

const SPEC_COPY: &str = "spec.md";
const STATE_EXCERPT: &str = "state_excerpt.json";
const DIFF_PATCH: &str = "diff.patch";
const DIFF_TEXT: &str = "diff.txt";

const NO_GIT_MESSAGE: &str =
    "git diff unavailable: 'git' is not installed or the workflow root is not a git repository.\n";

/// Root-relative paths of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketReport {
    pub spec_copy: String,
    pub state_excerpt: String,
    pub test_output: String,
    pub test_exit: i32,
    pub diff: String,
}

impl PacketReport {
    /// Lines the CLI prints on stdout.
    pub fn report_lines(&self) -> Vec<String> {
        vec![
            "Review packet updated:".to_string(),
            format!("- {}", self.spec_copy),
            format!("- {}", self.state_excerpt),
            format!("- {} (test exit {})", self.test_output, self.test_exit),
            format!("- {}", self.diff),
        ]
    }
}

/// Workflow state keys shown to the reviewer, in display order.
#[derive(Serialize)]
struct StateExcerpt<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    current_brick: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_count: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_gate_failed: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_test_run: Option<&'a Value>,
}

impl<'a> StateExcerpt<'a> {
    fn from_state(state: &'a Value) -> Self {
        Self {
            current_brick: state.get("current_brick"),
            status: state.get("status"),
            loop_count: state.get("loop_count"),
            last_gate_failed: state.get("last_gate_failed"),
            last_test_run: state.get("last_test_run"),
        }
    }
}

/// Build the packet, running the full test gate through `runner`.
#[instrument(skip_all, fields(root = %workflow.paths.root.display()))]
pub fn build_packet<R: CommandRunner>(workflow: &Workflow, runner: &R) -> Result<PacketReport> {
    let paths = &workflow.paths;
    fs::create_dir_all(&paths.packet_dir)
        .with_context(|| format!("create packet dir {}", paths.packet_dir.display()))?;

    let spec_copy = paths.packet_dir.join(SPEC_COPY);
    fs::copy(&paths.spec_path, &spec_copy)
        .with_context(|| format!("copy brick contract {}", paths.spec_path.display()))?;

    let test = run_test_gate_with(workflow, runner)?;

    let state_excerpt = paths.packet_dir.join(STATE_EXCERPT);
    write_state_excerpt(&paths.state_path, &state_excerpt)?;

    let diff = write_diff(paths)?;

    info!(test_exit = test.exit_code, "review packet updated");
    Ok(PacketReport {
        spec_copy: paths.display_rel(&spec_copy),
        state_excerpt: paths.display_rel(&state_excerpt),
        test_output: test.record.artifact_path,
        test_exit: test.exit_code,
        diff: paths.display_rel(&diff),
    })
}

fn write_state_excerpt(state_path: &Path, excerpt_path: &Path) -> Result<()> {
    let contents = fs::read_to_string(state_path)
        .with_context(|| format!("read state {}", state_path.display()))?;
    let state: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse state {}", state_path.display()))?;
    write_json_atomic(excerpt_path, &StateExcerpt::from_state(&state))
        .context("write state excerpt")
}

/// Write the diff artifact and remove the stale alternative.
fn write_diff(paths: &GatePaths) -> Result<PathBuf> {
    let patch_path = paths.packet_dir.join(DIFF_PATCH);
    let text_path = paths.packet_dir.join(DIFF_TEXT);

    if detect_mode(&paths.root) == DetectMode::Git {
        match Git::new(&paths.root).diff_head() {
            Ok(diff) => {
                write_atomic(&patch_path, &diff).context("write diff patch")?;
                remove_if_present(&text_path)?;
                return Ok(patch_path);
            }
            Err(err) => {
                warn!(err = %err, "git diff failed, writing text diff instead");
                let text = format!("git diff unavailable: {err:#}\n");
                write_atomic(&text_path, &text).context("write diff text")?;
                remove_if_present(&patch_path)?;
                return Ok(text_path);
            }
        }
    }

    let mut text = NO_GIT_MESSAGE.to_string();
    text.push_str(&snapshot_summary(paths));
    write_atomic(&text_path, &text).context("write diff text")?;
    remove_if_present(&patch_path)?;
    Ok(text_path)
}

/// Changed files since the snapshot baseline, or why there is no list.
fn snapshot_summary(paths: &GatePaths) -> String {
    let source = SnapshotChangeSource::new(&paths.root, &paths.snapshot_path);
    match source.changed_paths() {
        Ok(changed) if changed.is_empty() => {
            "\nNo files changed since the snapshot baseline.\n".to_string()
        }
        Ok(changed) => {
            let mut out = String::from("\nChanged files since the snapshot baseline:\n");
            for path in changed {
                out.push_str(&format!("- {path}\n"));
            }
            out
        }
        Err(err) => format!("\nSnapshot change list unavailable: {err:#}\n"),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}
