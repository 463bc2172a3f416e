//! Test-only helpers: temporary workflow roots, git fixtures and a scripted
//! command runner.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::config::GateConfig;
use crate::io::paths::{GatePaths, Workflow};
use crate::io::process::{CapturedRun, CommandRunner, RunOutcome};
use crate::io::workflow_state::{load_state, write_state};
use crate::state::WorkflowState;

/// A throwaway workflow root with default artifact paths.
pub struct TempWorkflow {
    dir: TempDir,
}

impl TempWorkflow {
    /// Empty root with a fresh `state.json` for `brick`.
    pub fn new(brick: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workflow root")?;
        let workflow = Self { dir };
        workflow.write_state(&WorkflowState::new(brick))?;
        Ok(workflow)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn workflow(&self) -> Workflow {
        Workflow::with_config(self.root(), GateConfig::default())
    }

    pub fn paths(&self) -> GatePaths {
        self.workflow().paths
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.root().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn write_state(&self, state: &WorkflowState) -> Result<()> {
        write_state(&self.paths().state_path, state)
    }

    pub fn state(&self) -> Result<WorkflowState> {
        load_state(&self.paths().state_path)
    }

    /// Handover log contents, or empty if nothing was logged yet.
    pub fn handover(&self) -> String {
        fs::read_to_string(self.paths().handover_path).unwrap_or_default()
    }
}

/// Make `root` a git repository with everything currently in it committed.
pub fn init_git_repo(root: &Path) -> Result<()> {
    git(root, &["init", "-q"])?;
    git(root, &["add", "-A"])?;
    git(
        root,
        &[
            "-c",
            "user.name=Brickgate Tests",
            "-c",
            "user.email=tests@brickgate.invalid",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "--allow-empty",
            "-m",
            "baseline",
        ],
    )
}

fn git(root: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}

/// Successful-exit outcome with the given code and output.
pub fn exited(exit_code: i32, output: &str) -> RunOutcome {
    RunOutcome::Exited(CapturedRun {
        exit_code,
        output: output.to_string(),
        truncated_bytes: 0,
        timed_out: false,
    })
}

/// Launch failure for `program` with the given error kind.
pub fn launch_failed(program: &str, kind: ErrorKind) -> RunOutcome {
    RunOutcome::LaunchFailed {
        program: program.to_string(),
        kind,
        message: format!("{kind}"),
    }
}

/// Command runner that replays scripted outcomes in order and records every
/// argument vector it was asked to run.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    outcomes: RefCell<VecDeque<RunOutcome>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String], _workdir: &Path) -> Result<RunOutcome> {
        self.calls.borrow_mut().push(argv.to_vec());
        self.outcomes
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted outcome left for {argv:?}"))
    }
}
