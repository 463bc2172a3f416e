//! Git adapter for change detection and review diffs.
//!
//! Gates only ever read from git, so we keep a small, explicit wrapper
//! around `git` subprocess calls.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// True if `git` is installed and reports the workdir is inside a work tree.
    ///
    /// Never fails: an absent `git` binary or a non-repository both mean "no".
    #[instrument(skip_all)]
    pub fn is_inside_work_tree(&self) -> bool {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => {
                let inside = output.status.success()
                    && String::from_utf8_lossy(&output.stdout).trim() == "true";
                debug!(inside, "probed git work tree");
                inside
            }
            Err(err) => {
                debug!(err = %err, "git probe failed");
                false
            }
        }
    }

    /// Paths whose content differs from `HEAD`, regardless of staging, followed
    /// by untracked files that are not ignored.
    ///
    /// Both lists cover the whole repository, even when the workdir is a
    /// subdirectory. Paths are relative to the repository top level, in git's
    /// reported order, without duplicates. Deleted files are included.
    #[instrument(skip_all)]
    pub fn changed_paths_against_head(&self) -> Result<Vec<String>> {
        let tracked = self.run_capture(&["diff", "HEAD", "--name-only", "-z"])?;
        let untracked = self.run_capture(&[
            "ls-files",
            "--others",
            "--exclude-standard",
            "--full-name",
            "-z",
            "--",
            ":/",
        ])?;

        let mut paths: Vec<String> = Vec::new();
        for path in parse_nul_list(&tracked)
            .into_iter()
            .chain(parse_nul_list(&untracked))
        {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        debug!(count = paths.len(), "git change set");
        Ok(paths)
    }

    /// Full working-tree diff against `HEAD`.
    pub fn diff_head(&self) -> Result<String> {
        self.run_capture(&["diff", "HEAD"])
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                format!("exit {:?}", output.status.code())
            } else {
                stderr.trim().to_string()
            };
            return Err(anyhow!("git {} failed: {}", args.join(" "), detail));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    anyhow!("git is not installed")
                } else {
                    anyhow!(err)
                }
            })
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

/// Split `-z` output into non-empty paths.
fn parse_nul_list(raw: &str) -> Vec<String> {
    raw.split('\0')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_git_repo;
    use std::fs;

    #[test]
    fn parses_nul_separated_paths() {
        let raw = "src/a.rs\0dir with space/b.txt\0\0";
        assert_eq!(
            parse_nul_list(raw),
            vec!["src/a.rs".to_string(), "dir with space/b.txt".to_string()]
        );
    }

    #[test]
    fn plain_directory_is_not_a_work_tree() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(!Git::new(temp.path()).is_inside_work_tree());
    }

    #[test]
    fn reports_modified_untracked_and_deleted_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("kept.txt"), "same\n").expect("write");
        fs::write(root.join("edited.txt"), "before\n").expect("write");
        fs::write(root.join("removed.txt"), "bye\n").expect("write");
        init_git_repo(root).expect("git repo");

        fs::write(root.join("edited.txt"), "after\n").expect("edit");
        fs::remove_file(root.join("removed.txt")).expect("remove");
        fs::write(root.join("new.txt"), "hello\n").expect("new");

        let git = Git::new(root);
        assert!(git.is_inside_work_tree());
        let changed = git.changed_paths_against_head().expect("changes");
        assert_eq!(changed, vec!["edited.txt", "removed.txt", "new.txt"]);
    }

    #[test]
    fn subdirectory_workdir_sees_changes_across_the_repo() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("work")).expect("mkdir");
        fs::write(root.join("top.txt"), "1\n").expect("write");
        fs::write(root.join("work/inner.txt"), "1\n").expect("write");
        init_git_repo(root).expect("git repo");

        fs::write(root.join("top.txt"), "2\n").expect("edit");
        fs::write(root.join("stray.txt"), "new\n").expect("untracked outside");
        fs::write(root.join("work/fresh.txt"), "new\n").expect("untracked inside");

        let changed = Git::new(root.join("work"))
            .changed_paths_against_head()
            .expect("changes");
        assert_eq!(changed.len(), 3, "{changed:?}");
        assert_eq!(changed[0], "top.txt");
        assert!(changed.contains(&"stray.txt".to_string()));
        assert!(changed.contains(&"work/fresh.txt".to_string()));
    }

    #[test]
    fn staging_does_not_hide_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("a.txt"), "1\n").expect("write");
        init_git_repo(root).expect("git repo");

        fs::write(root.join("a.txt"), "2\n").expect("edit");
        let status = Command::new("git")
            .args(["add", "a.txt"])
            .current_dir(root)
            .status()
            .expect("git add");
        assert!(status.success());

        let changed = Git::new(root).changed_paths_against_head().expect("changes");
        assert_eq!(changed, vec!["a.txt"]);
    }
}
