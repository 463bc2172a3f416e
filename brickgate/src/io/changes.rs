//! Change-set detection with environment-selected backends.
//!
//! The backend is never chosen by the caller: a root that is a git work tree
//! always uses git, anything else uses the snapshot baseline.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, instrument};

use super::git::Git;
use super::paths::GatePaths;
use super::snapshot::{changed_paths, read_snapshot, take_snapshot};
use crate::core::types::DetectMode;

/// Paths that differ from a baseline, in the backend's reported order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub mode: DetectMode,
    pub paths: Vec<String>,
}

/// A baseline the working tree can be compared against.
pub trait ChangeSetSource {
    fn mode(&self) -> DetectMode;
    fn changed_paths(&self) -> Result<Vec<String>>;
}

/// Working tree vs. `HEAD`, staged or not, plus untracked files.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    git: Git,
}

impl GitChangeSource {
    pub fn new(root: &Path) -> Self {
        Self { git: Git::new(root) }
    }
}

impl ChangeSetSource for GitChangeSource {
    fn mode(&self) -> DetectMode {
        DetectMode::Git
    }

    fn changed_paths(&self) -> Result<Vec<String>> {
        self.git.changed_paths_against_head()
    }
}

/// Current file digests vs. the recorded snapshot baseline.
#[derive(Debug, Clone)]
pub struct SnapshotChangeSource {
    root: PathBuf,
    snapshot_path: PathBuf,
}

impl SnapshotChangeSource {
    pub fn new(root: &Path, snapshot_path: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            snapshot_path: snapshot_path.to_path_buf(),
        }
    }
}

impl ChangeSetSource for SnapshotChangeSource {
    fn mode(&self) -> DetectMode {
        DetectMode::Snapshot
    }

    fn changed_paths(&self) -> Result<Vec<String>> {
        let before = read_snapshot(&self.snapshot_path)?;
        let after = take_snapshot(&self.root, &self.snapshot_path)?;
        Ok(changed_paths(&before, &after))
    }
}

/// Git if `root` has a `.git` entry or git reports a work tree there.
pub fn detect_mode(root: &Path) -> DetectMode {
    if root.join(".git").exists() || Git::new(root).is_inside_work_tree() {
        DetectMode::Git
    } else {
        DetectMode::Snapshot
    }
}

pub fn select_source(paths: &GatePaths) -> Box<dyn ChangeSetSource> {
    match detect_mode(&paths.root) {
        DetectMode::Git => Box::new(GitChangeSource::new(&paths.root)),
        DetectMode::Snapshot => Box::new(SnapshotChangeSource::new(
            &paths.root,
            &paths.snapshot_path,
        )),
    }
}

/// Detect changes under the workflow root with the environment's backend.
#[instrument(skip_all, fields(root = %paths.root.display()))]
pub fn detect_changes(paths: &GatePaths) -> Result<ChangeSet> {
    let source = select_source(paths);
    let mode = source.mode();
    let changed = source.changed_paths()?;
    debug!(mode = mode.as_str(), count = changed.len(), "change set detected");
    Ok(ChangeSet {
        mode,
        paths: changed,
    })
}
